pub mod battery;
pub mod session_store;

pub use battery::BatteryData;
pub use session_store::SqliteSessionStore;
