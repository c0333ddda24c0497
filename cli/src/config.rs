use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::Level;
use trickle_core::EstimatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "off" | "none" => Some(LogLevel::Off),
            "error" => Some(LogLevel::Error),
            "warn" | "warning" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub log_level: LogLevel,
    /// Manual capacity override. 0 asks the platform battery.
    pub capacity_mah: f64,
    pub battery_poll_ms: u64,
    pub store_sessions: bool,
    pub estimator: EstimatorConfig,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            capacity_mah: 0.0,
            battery_poll_ms: 2000,
            store_sessions: true,
            estimator: EstimatorConfig::default(),
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("trickle")
}

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("trickle")
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("trickle")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn ensure_dirs() -> std::io::Result<()> {
    fs::create_dir_all(config_dir())?;
    fs::create_dir_all(data_dir())?;
    Ok(())
}

impl UserConfig {
    pub fn load() -> Self {
        let path = config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parses config text, falling back to defaults for invalid files or
    /// estimator values outside their valid ranges.
    pub fn parse(content: &str) -> Self {
        let mut config: Self = toml::from_str(content).unwrap_or_default();
        if let Err(e) = config.estimator.validate() {
            tracing::warn!(error = %e, "Invalid estimator settings, using defaults");
            config.estimator = EstimatorConfig::default();
        }
        config
    }

    pub fn save(&self) -> std::io::Result<()> {
        let _ = ensure_dirs();
        let path = config_path();
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, content)
    }

    pub fn merge_with_args(&mut self, capacity_mah: Option<f64>, interval_secs: Option<u64>) {
        if let Some(mah) = capacity_mah {
            self.capacity_mah = mah;
        }
        if let Some(secs) = interval_secs.filter(|s| *s > 0) {
            self.estimator.sample_interval_secs = secs;
        }
    }

    pub fn capacity_override(&self) -> Option<f64> {
        (self.capacity_mah > 0.0).then_some(self.capacity_mah)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trickle_core::BackgroundPolicy;

    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = UserConfig::parse(
            r#"
            capacity_mah = 4500.0

            [estimator]
            background_policy = "pause_and_resume"
            "#,
        );

        assert_eq!(config.capacity_override(), Some(4500.0));
        assert_eq!(config.battery_poll_ms, 2000);
        assert_eq!(
            config.estimator.background_policy,
            BackgroundPolicy::PauseAndResume
        );
        assert_eq!(config.estimator.smoothing_alpha, 0.1);
        assert_eq!(config.estimator.window_secs, 90);
    }

    #[test]
    fn test_invalid_estimator_falls_back() {
        let config = UserConfig::parse(
            r#"
            [estimator]
            smoothing_alpha = 4.0
            "#,
        );
        assert_eq!(config.estimator, EstimatorConfig::default());
    }

    #[test]
    fn test_garbage_file_is_default() {
        let config = UserConfig::parse("this is = = not toml");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.capacity_override(), None);
    }

    #[test]
    fn test_round_trip() {
        let mut config = UserConfig::default();
        config.log_level = LogLevel::Debug;
        config.estimator.window_secs = 120;

        let text = toml::to_string_pretty(&config).unwrap();
        let back = UserConfig::parse(&text);

        assert_eq!(back.log_level, LogLevel::Debug);
        assert_eq!(back.estimator, config.estimator);
    }

    #[test]
    fn test_defaults_match_documented_config() {
        let config = UserConfig::parse("");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.capacity_mah, 0.0);
        assert_eq!(config.battery_poll_ms, 2000);
        assert!(config.store_sessions);

        let text = toml::to_string_pretty(&UserConfig::default()).unwrap();
        assert!(text.contains("log_level = \"warn\""));
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = UserConfig::default();
        config.merge_with_args(Some(3200.0), Some(0));
        assert_eq!(config.capacity_mah, 3200.0);
        assert_eq!(config.estimator.sample_interval_secs, 5);

        config.merge_with_args(None, Some(10));
        assert_eq!(config.capacity_mah, 3200.0);
        assert_eq!(config.estimator.sample_interval_secs, 10);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("none"), Some(LogLevel::Off));
        assert_eq!(LogLevel::from_str("loud"), None);
        assert_eq!(LogLevel::Off.as_tracing_level(), None);
        assert_eq!(LogLevel::Trace.as_tracing_level(), Some(Level::TRACE));
    }
}
