//! Charging power estimation and session tracking for trickle.
//!
//! This crate turns successive battery level readings into a smoothed
//! charging wattage, projects time-to-full, and tracks the lifecycle of a
//! charging session. It performs no I/O: capacity and persistence are
//! supplied through the [`CapacityProvider`] and [`SessionStore`] traits.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use trickle_core::{
//!     CapacityInput, ChargeState, ControllerEvent, EstimatorConfig, FixedCapacity, NullStore,
//!     SessionController,
//! };
//!
//! let capacity = FixedCapacity(CapacityInput::new(3000.0, 3.82).unwrap());
//! let mut controller = SessionController::new(EstimatorConfig::default(), capacity, NullStore);
//!
//! let outcome = controller.handle(
//!     ControllerEvent::BatteryChanged { state: ChargeState::Charging, level: 0.42 },
//!     Utc::now(),
//! );
//! assert!(outcome.snapshot().unwrap().is_charging);
//! ```

mod buffer;
mod config;
mod controller;
mod error;
mod estimator;
mod eta;
mod provider;
mod session;
mod types;

pub use buffer::SampleBuffer;
pub use config::{
    BackgroundPolicy, EstimatorConfig, DEFAULT_SAMPLE_INTERVAL_SECS, DEFAULT_SMOOTHING_ALPHA,
    DEFAULT_WINDOW_SECS,
};
pub use controller::{
    transition, ActiveSession, ControllerEvent, ControllerState, Effect, Phase, SessionController,
    StepContext, StepOutcome,
};
pub use error::{CapacityError, ConfigError, StoreError};
pub use estimator::{instant_watts, PowerEstimator};
pub use eta::{format_eta, project as project_eta};
pub use provider::{resolve_capacity, CapacityProvider, FixedCapacity, NullStore, SessionStore};
pub use session::{MetricsSnapshot, Session};
pub use types::{
    CapacityInput, ChargeState, Sample, DEFAULT_NOMINAL_VOLTAGE, FALLBACK_CAPACITY_MAH,
};
