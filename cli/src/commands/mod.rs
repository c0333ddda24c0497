pub mod config;
pub mod history;
pub mod logs;
pub mod monitor;
