//! Logging utilities for the Cita booking engine.
//!
//! All crates log through `tracing`. The binary calls [`init_with_level`] once at
//! startup; tests may call it repeatedly since a second initialisation is ignored.

use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crate targets that receive the configured level.
const CITA_TARGETS: &[&str] = &[
    "cita_backend",
    "cita_booking",
    "cita_common",
    "cita_db",
    "cita_gcal",
];

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use cita_common::logging;
///
/// logging::init();
/// logging::init_with_level(tracing::Level::DEBUG);
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` directives are honoured; the level given here is added on top for
/// the Cita crates.
pub fn init_with_level(level: Level) {
    let mut filter = EnvFilter::from_default_env();
    for target in CITA_TARGETS {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Parses a textual level from configuration, falling back to INFO.
pub fn parse_level(level: Option<&str>) -> Level {
    level
        .and_then(|l| l.trim().parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}
