use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;

/// Initialize the global tracing subscriber. Honors `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Load `.env` into the process environment if present.
pub fn init_env() {
    if dotenvy::dotenv().is_ok() {
        tracing::info!("Loaded environment from .env");
    }
}

/// Bind and serve the application until the process is stopped.
pub async fn serve(app: Router, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
