//! Tracing and logging (shared setup).

/// Initialize process-wide logging from the environment.
///
/// `RUST_LOG` sets the filter (default `info`); `LOG_FORMAT=pretty` switches
/// from JSON to human-readable output. Safe to call multiple times;
/// subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;
