//! Error types shared between the core and its collaborators.

/// Errors raised at the capacity provider boundary.
#[derive(Debug, thiserror::Error)]
pub enum CapacityError {
    #[error("Invalid capacity {field}: {value}")]
    Invalid { field: &'static str, value: f64 },

    #[error("Capacity unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by a session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store is closed")]
    Closed,
}

/// Errors raised when validating estimator configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("smoothing_alpha must be in (0, 1], got {0}")]
    Alpha(f64),

    #[error("window_secs must be greater than zero")]
    Window,

    #[error("sample_interval_secs must be greater than zero")]
    Interval,

    #[error("nominal_voltage must be positive, got {0}")]
    Voltage(f64),
}
