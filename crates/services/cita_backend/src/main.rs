// File: services/cita_backend/src/main.rs
use cita_backend::app_state::{AppState, StartupError};
use cita_backend::build_router;
use cita_common::logging;
use cita_config::load_config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = Arc::new(load_config().map_err(|e| StartupError::Config(e.to_string()))?);
    logging::init_with_level(logging::parse_level(config.log_level.as_deref()));

    let state = AppState::new(config.clone()).await?;
    let _sweep = state.spawn_sweep();
    let app = build_router(&state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
