// --- File: crates/cita_common/src/lib.rs ---

// Declare modules within this crate
pub mod error; // Error handling
pub mod http; // HTTP error responses
pub mod logging; // Logging utilities
pub mod models; // Domain data structures
pub mod services; // Calendar service abstraction

// Re-export error types and utilities for easier access
pub use error::{CitaError, HttpStatusCode};

// Re-export HTTP utilities for easier access
pub use http::IntoHttpResponse;

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level, parse_level};
