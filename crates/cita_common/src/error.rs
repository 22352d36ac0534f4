// --- File: crates/cita_common/src/error.rs ---
use thiserror::Error;

/// The application-level error shared by every Cita crate.
///
/// Domain crates keep their own error enums and convert into `CitaError` at the
/// HTTP boundary, where the variant decides the status code the caller sees.
#[derive(Error, Debug)]
pub enum CitaError {
    /// The request could not be understood (bad date, bad time, bad contact data)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The requested slot is already held by someone else
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Broken invariant or unexpected failure
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for CitaError {
    fn status_code(&self) -> u16 {
        match self {
            CitaError::ValidationError(_) => 400,
            CitaError::ConfigError(_) => 500,
            CitaError::ConflictError(_) => 409,
            CitaError::InternalError(_) => 500,
        }
    }
}
