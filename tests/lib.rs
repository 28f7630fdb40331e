// Shared transports and fixtures for the behavioral test suites.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

pub use shiplane_core::{
    Address, CarrierError, CarrierErrorKind, CarrierGateway, CarrierId, CarrierSelection,
    CarrierSettings, DhlSettings, Dimensions, FedexSettings, GatewayConfig, HttpClient, HttpError,
    HttpMethod, HttpRequest, HttpResponse, Parcel, RateLookup, RetryConfig, UpsSettings,
    WarehouseSelector,
};

/// Transport that answers scripted responses in order and records every
/// request it saw. An exhausted script answers a non-retryable error.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, status: u16, body: impl Into<String>) {
        self.push(Ok(HttpResponse {
            status,
            body: body.into(),
        }));
    }

    pub fn push_err(&self, error: HttpError) {
        self.push(Err(error));
    }

    pub fn push(&self, response: Result<HttpResponse, HttpError>) {
        self.script
            .lock()
            .expect("script lock")
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::non_retryable("no scripted response left")))
        })
    }
}

/// Transport that routes by URL fragment, so concurrent fan-out stays
/// deterministic. The first matching rule wins and stays in place for
/// repeat calls; unmatched requests answer a non-retryable error.
#[derive(Debug, Default)]
pub struct RoutedHttpClient {
    rules: Mutex<Vec<(String, Result<HttpResponse, HttpError>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, url_fragment: impl Into<String>, response: Result<HttpResponse, HttpError>) {
        self.rules
            .lock()
            .expect("rules lock")
            .push((url_fragment.into(), response));
    }

    pub fn on_ok(&self, url_fragment: impl Into<String>, status: u16, body: impl Into<String>) {
        self.on(
            url_fragment,
            Ok(HttpResponse {
                status,
                body: body.into(),
            }),
        );
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.url)
            .collect()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let url = request.url.clone();
            self.requests.lock().expect("requests lock").push(request);
            let rules = self.rules.lock().expect("rules lock");
            rules
                .iter()
                .find(|(fragment, _)| url.contains(fragment.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Err(HttpError::non_retryable(format!("no route for {url}"))))
        })
    }
}

pub fn za_address(city: &str) -> Address {
    Address::new("1 Main Rd", city, "GP", "ZA", "2000").expect("valid address")
}

pub fn coordinate_address(lat: f64, lng: f64) -> Address {
    za_address("Somewhere")
        .with_coordinates(lat, lng)
        .expect("valid coordinates")
}

pub fn small_dimensions() -> Dimensions {
    Dimensions::new(30.0, 20.0, 10.0).expect("valid dimensions")
}
