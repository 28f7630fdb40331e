use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shiplane_core::{CarrierSettings, GatewayBuilder, HttpClient, ReqwestHttpClient};
use shiplane_web::{create_router, AppState};

/// Shiplane HTTP API server.
///
/// Carrier credentials are read from `SHIPLANE_*` environment variables;
/// carriers without credentials are skipped at startup.
#[derive(Debug, Parser)]
#[command(name = "shiplane", version, about)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    bind: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[derive(Debug, thiserror::Error)]
enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServeError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServeArgs::parse();

    let settings = CarrierSettings::from_env();
    let configured = settings.configured();
    if configured.is_empty() {
        tracing::warn!("no carrier credentials configured, every rate lookup will return errors");
    } else {
        tracing::info!(carriers = ?configured, "carrier credentials loaded");
    }

    // One client so the gateway and the OAuth exchanger share a connection pool.
    let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let gateway = GatewayBuilder::new(settings.clone())
        .with_http_client(Arc::clone(&http_client))
        .build();
    let state = AppState::new(gateway, settings, http_client);

    let addr = SocketAddr::from((args.bind, args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
