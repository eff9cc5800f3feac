//! Tracing/logging setup shared by processes hosting the detach worker.

/// Initialize process-wide logging using `PROMOLINK_LOG_FORMAT` (default JSON).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::{LogFormat, init_with};
