//! Bestiary HTTP server.
//!
//! Run from repo root: `cargo run -p bestiary-server`

use bestiary::{get_app, init_tracing, Settings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let settings = Settings::from_env()?;
    tracing::info!(environment = %settings.environment, profile = %settings.profile.name, "starting");
    let (app, _state) = get_app(&settings).await?;

    let listener = TcpListener::bind(("0.0.0.0", settings.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
