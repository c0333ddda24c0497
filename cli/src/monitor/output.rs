use std::time::Duration;

use serde::Serialize;
use trickle_core::{format_eta, ChargeState, MetricsSnapshot, Session};

/// One line of `trickle monitor --json` output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorLine<'a> {
    Metrics(&'a MetricsSnapshot),
    SessionFinished(&'a Session),
}

#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

impl Output {
    pub fn metrics(&self, snapshot: &MetricsSnapshot, state: ChargeState) {
        if self.json {
            self.emit(&MonitorLine::Metrics(snapshot));
        } else {
            println!("{}", format_metrics(snapshot, state));
        }
    }

    pub fn session_finished(&self, session: &Session) {
        if self.json {
            self.emit(&MonitorLine::SessionFinished(session));
        } else {
            println!("{}", format_session(session));
        }
    }

    fn emit(&self, line: &MonitorLine<'_>) {
        match serde_json::to_string(line) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!(error = %e, "Failed to serialize output"),
        }
    }
}

pub fn format_metrics(snapshot: &MetricsSnapshot, state: ChargeState) -> String {
    let level = snapshot.battery_level * 100.0;
    if !snapshot.is_charging {
        return format!("{:<9} {:>5.1}%", state.label(), level);
    }

    let eta = format_eta(snapshot.eta_to_full).unwrap_or_else(|| "--".to_string());
    format!(
        "{:<9} {:>5.1}%  {:>5.2} W  peak {:.2} W  avg {:.2} W  full in {}  ({})",
        "Session",
        level,
        snapshot.current_watts,
        snapshot.peak_watts,
        snapshot.average_watts,
        eta,
        format_elapsed(snapshot.session_duration),
    )
}

pub fn format_session(session: &Session) -> String {
    let elapsed = session
        .end_time
        .map(|end| session.duration(end))
        .unwrap_or_default();

    let mut line = format!(
        "Session {} finished: {:+.1}% in {}, avg {:.2} W, peak {:.2} W",
        short_id(session),
        session.delta_percent,
        format_elapsed(elapsed),
        session.average_watts,
        session.peak_watts,
    );
    if let Some(label) = &session.charger_label {
        line.push_str(&format!(" [{label}]"));
    }
    line
}

/// Elapsed time rounded to whole seconds.
pub fn format_elapsed(elapsed: Duration) -> String {
    humantime::format_duration(Duration::from_secs(elapsed.as_secs())).to_string()
}

pub fn short_id(session: &Session) -> String {
    session.id.simple().to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_idle_line() {
        let snapshot = MetricsSnapshot {
            battery_level: 0.42,
            ..Default::default()
        };
        assert_eq!(
            format_metrics(&snapshot, ChargeState::Unplugged),
            "Unplugged  42.0%"
        );
    }

    #[test]
    fn test_charging_line() {
        let snapshot = MetricsSnapshot {
            session_id: Some(Uuid::nil()),
            is_charging: true,
            battery_level: 0.5,
            current_watts: 6.876,
            peak_watts: 7.0,
            average_watts: 6.5,
            session_duration: Duration::from_millis(125_400),
            eta_to_full: Duration::from_secs(3900),
        };
        assert_eq!(
            format_metrics(&snapshot, ChargeState::Charging),
            "Session    50.0%   6.88 W  peak 7.00 W  avg 6.50 W  full in 1h 5m  (2m 5s)"
        );
    }

    #[test]
    fn test_session_line() {
        let start = Utc.timestamp_opt(1_735_689_600, 0).unwrap();
        let session = Session {
            id: Uuid::from_u128(0xabcdef12_0000_0000_0000_000000000000),
            start_time: start,
            end_time: Some(start + chrono::Duration::seconds(600)),
            average_watts: 5.0,
            peak_watts: 9.25,
            delta_percent: -2.0,
            charger_label: Some("Car".to_string()),
            notes: None,
        };
        assert_eq!(
            format_session(&session),
            "Session abcdef12 finished: -2.0% in 10m, avg 5.00 W, peak 9.25 W [Car]"
        );
    }

    #[test]
    fn test_json_line_is_tagged() {
        let snapshot = MetricsSnapshot::default();
        let json = serde_json::to_value(MonitorLine::Metrics(&snapshot)).unwrap();
        assert_eq!(json["type"], "metrics");
        assert_eq!(json["is_charging"], false);
    }
}
