//! Time-to-full projection.

use std::time::Duration;

use crate::types::CapacityInput;

/// Projects the time until the battery reaches 100% at the smoothed rate.
///
/// Returns a zero duration when the battery is already full or there is no
/// positive charging power to project from.
pub fn project(level: f64, smoothed_watts: f64, capacity: &CapacityInput) -> Duration {
    if smoothed_watts <= 0.0 || level >= 1.0 || !smoothed_watts.is_finite() {
        return Duration::ZERO;
    }

    let remaining_percent = (1.0 - level) * 100.0;
    let remaining_mah = capacity.milliamp_hours * (remaining_percent / 100.0);
    let current_ma = (smoothed_watts / capacity.nominal_voltage) * 1000.0;
    let secs = (remaining_mah / current_ma) * 3600.0;

    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Formats an ETA as `"1h 5m"`, `"12m"` or `"< 1m"`.
///
/// Zero durations mean "no projection" and format as `None`.
pub fn format_eta(eta: Duration) -> Option<String> {
    if eta.is_zero() {
        return None;
    }

    let total_mins = eta.as_secs() / 60;
    if total_mins == 0 {
        return Some("< 1m".to_string());
    }
    let hours = total_mins / 60;
    let mins = total_mins % 60;

    if hours > 0 {
        Some(format!("{}h {}m", hours, mins))
    } else {
        Some(format!("{}m", mins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capacity(mah: f64) -> CapacityInput {
        CapacityInput::new(mah, 3.82).unwrap()
    }

    #[test]
    fn test_eta_formula() {
        let eta = project(0.90, 10.0, &capacity(3000.0));
        // 300 mAh remaining at ~2617.8 mA
        assert!((eta.as_secs_f64() - 412.6).abs() < 1.0, "got {:?}", eta);
    }

    #[test]
    fn test_degenerate_eta_is_zero() {
        for mah in [500.0, 3000.0, 10_000.0] {
            let cap = capacity(mah);
            assert_eq!(project(1.0, 10.0, &cap), Duration::ZERO);
            assert_eq!(project(0.5, 0.0, &cap), Duration::ZERO);
            assert_eq!(project(0.5, -3.0, &cap), Duration::ZERO);
        }
    }

    #[test]
    fn test_empty_battery_projects_full_capacity() {
        let eta = project(0.0, 3.82, &capacity(1000.0));
        // 1000 mAh at 1000 mA
        assert!((eta.as_secs_f64() - 3600.0).abs() < 0.001);
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(Duration::ZERO), None);
        assert_eq!(format_eta(Duration::from_secs(30)), Some("< 1m".to_string()));
        assert_eq!(format_eta(Duration::from_secs(412)), Some("6m".to_string()));
        assert_eq!(format_eta(Duration::from_secs(3900)), Some("1h 5m".to_string()));
    }
}
