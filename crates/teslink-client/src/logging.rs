//! Tracing subscriber configuration for teslink clients.
//!
//! Log levels follow these conventions:
//! - ERROR: unrecoverable failures (no adapter, poisoned state)
//! - WARN: recoverable conditions (write-mode fallback, shrunk block
//!   length, discarded stale frames, responses failing authentication)
//! - INFO: high-level events (GATT link established, session established,
//!   enrollment request sent)
//! - DEBUG: handshake steps, request correlation, dropped messages
//! - TRACE: raw chunk traffic

use tracing_subscriber::EnvFilter;

/// Default directives: the BLE stack is kept at WARN so protocol events
/// stay readable. `RUST_LOG` overrides everything.
const DEFAULT_DIRECTIVES: &str = "info,btleplug=warn";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize the tracing subscriber with sensible defaults.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(filter_or(DEFAULT_DIRECTIVES))
        .init();
}

/// Initialize the tracing subscriber with JSON output, for clients
/// embedded in a larger service.
pub fn init_json() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter_or(DEFAULT_DIRECTIVES))
        .init();
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` so repeated calls across test cases are harmless, and
/// raises the default to DEBUG, where the handshake and correlation steps
/// log.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_or("debug,btleplug=info"))
        .with_test_writer()
        .try_init();
}
