use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = vidhub::initialize_state().await?;
    let addr =
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, state.config.port()));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "server started");

    axum::serve(listener, vidhub::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
