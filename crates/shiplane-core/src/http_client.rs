use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

/// Minimal HTTP method set needed by carrier adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Authentication strategy applied to outgoing HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    /// OAuth bearer token (FedEx and UPS API calls).
    BearerToken(String),
    /// HTTP Basic credentials (UPS token endpoint).
    Basic { username: String, password: String },
    /// Pre-provisioned key in a named header (DHL).
    ApiKey { header: String, key: String },
}

impl HttpAuth {
    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        let header = match self {
            Self::None => None,
            Self::BearerToken(token) => {
                Some((String::from("authorization"), format!("Bearer {token}")))
            }
            Self::Basic { username, password } => {
                let credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));
                Some((String::from("authorization"), format!("Basic {credentials}")))
            }
            Self::ApiKey { header, key } => Some((header.to_ascii_lowercase(), key.clone())),
        };
        if let Some((name, value)) = header {
            headers.insert(name, value);
        }
    }
}

/// HTTP request envelope used by adapter transport calls. Header names are
/// stored lowercased so scripted transports can assert on them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 5_000,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.with_header("content-type", "application/json")
    }

    pub fn with_form_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.with_header("content-type", "application/x-www-form-urlencoded")
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// HTTP response envelope returned by an adapter transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
    retryable: bool,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Adapter transport contract. Adapters, the OAuth exchanger, and the token
/// cache all go through this seam, so tests can script the wire.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production HTTP client using reqwest for real carrier calls.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent("shiplane/0.1.0")
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let HttpRequest {
                method,
                url,
                headers,
                body,
                timeout_ms,
            } = request;

            let mut outgoing = match method {
                HttpMethod::Get => self.client.get(&url),
                HttpMethod::Post => self.client.post(&url),
            }
            .timeout(Duration::from_millis(timeout_ms));
            for (name, value) in &headers {
                outgoing = outgoing.header(name, value);
            }
            if let Some(body) = body {
                outgoing = outgoing.body(body);
            }

            let response = outgoing.send().await.map_err(classify_send_error)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|error| {
                HttpError::new(format!("failed to read response body: {error}"))
            })?;

            Ok(HttpResponse { status, body })
        })
    }
}

fn classify_send_error(error: reqwest::Error) -> HttpError {
    let kind = if error.is_timeout() {
        "request timeout"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    HttpError::new(format!("{kind}: {error}"))
}
