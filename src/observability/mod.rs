//! Observability subsystem
//!
//! Provides:
//! - Structured JSON logging through `tracing`
//! - The typed [`Event`] vocabulary attached to every log line
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on derivation results
//! 3. No background threads
//!
//! # Usage
//!
//! ```ignore
//! use adamderive::observability::{self, Event};
//!
//! observability::init_logging(None);
//! tracing::info!(event = Event::BuildStart.as_str(), domain = "ADSL", "build started");
//! ```

mod events;

pub use events::Event;

#[cfg(not(test))]
use std::io::IsTerminal;
use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives
pub const LOG_ENV_VAR: &str = "ADAM_LOG";

/// Filter used when neither the environment nor the caller provides one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global JSON log subscriber writing to stderr.
///
/// Filter precedence: `ADAM_LOG`, then `fallback`, then `info`. Wrapped in
/// `Once` so tests and repeated CLI calls can invoke it freely.
pub fn init_logging(fallback: Option<&str>) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let directives = log_directives(fallback);
        let filter = EnvFilter::try_new(&directives)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        let builder = tracing_subscriber::fmt().json().with_env_filter(filter);

        #[cfg(not(test))]
        let installed = builder
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .try_init();

        // Unit tests log through the harness so output stays captured
        #[cfg(test)]
        let installed = builder.with_test_writer().try_init();

        if installed.is_ok() {
            tracing::debug!(filter = %directives, "log filter installed");
        }
    });
}

/// Resolves the effective filter directives
fn log_directives(fallback: Option<&str>) -> String {
    std::env::var(LOG_ENV_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}
