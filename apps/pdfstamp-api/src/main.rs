//! pdfstamp API Server - stamps signature images onto uploaded PDFs

use anyhow::Result;
use std::net::SocketAddr;
use tracing::info;

use pdfstamp_api::{app, UploadConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pdfstamp_api=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    let config = UploadConfig::from_env();
    let app = app(config);

    // Parse bind address
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting pdfstamp API on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
