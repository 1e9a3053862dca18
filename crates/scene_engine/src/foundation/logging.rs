//! Logging utilities
//!
//! The crate logs through the `log` facade; applications pick the backend.

pub use log::{debug, error, info, trace, warn};

/// Initialize the default `env_logger` backend.
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let _ = env_logger::try_init();
}

/// Initialize `env_logger` with a default filter used when `RUST_LOG` is unset
pub fn init_with_default_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env).try_init();
}
