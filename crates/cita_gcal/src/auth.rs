// --- File: crates/cita_gcal/src/auth.rs ---
use cita_config::GcalConfig;
use google_calendar3::{
    hyper_rustls::{self, HttpsConnectorBuilder},
    hyper_util::client::legacy::connect::HttpConnector,
    hyper_util::client::legacy::Client,
    yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator},
    CalendarHub,
};
use std::path::Path;
use thiserror::Error;
use tracing::info;

type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

pub type HubType = CalendarHub<Connector>;

/// Reasons the calendar hub could not be built at startup.
#[derive(Error, Debug)]
pub enum GcalSetupError {
    #[error("Missing {0} in gcal configuration")]
    MissingSetting(&'static str),
    #[error("Failed to read service account key {path}: {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Google authentication setup failed: {0}")]
    Auth(std::io::Error),
    #[error("TLS setup failed: {0}")]
    Tls(std::io::Error),
}

/// Builds an authenticated hub from the service account key in `config`.
pub async fn create_calendar_hub(config: &GcalConfig) -> Result<HubType, GcalSetupError> {
    let key_path = config
        .key_path
        .as_deref()
        .ok_or(GcalSetupError::MissingSetting("key_path"))?;

    let sa_key = read_service_account_key(Path::new(key_path))
        .await
        .map_err(|source| GcalSetupError::KeyFile {
            path: key_path.to_string(),
            source,
        })?;

    let auth = ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(GcalSetupError::Auth)?;

    let https = HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(GcalSetupError::Tls)?
        .https_or_http()
        .enable_http1()
        .build();

    let client = Client::builder(hyper_util::rt::TokioExecutor::new()).build(https);

    info!("Google Calendar hub created with key {}", key_path);
    Ok(CalendarHub::new(client, auth))
}
