use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use trickle_core::*;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap()
}

fn capacity() -> FixedCapacity {
    FixedCapacity(CapacityInput::new(3000.0, 3.82).unwrap())
}

#[derive(Default)]
struct RecordingStore {
    saved: Vec<Session>,
    annotated: Vec<Session>,
}

impl SessionStore for RecordingStore {
    fn save_session(&mut self, session: &Session) -> Result<(), StoreError> {
        self.saved.push(session.clone());
        Ok(())
    }

    fn annotate_session(&mut self, session: &Session) -> Result<(), StoreError> {
        self.annotated.push(session.clone());
        Ok(())
    }
}

struct FailingStore;

impl SessionStore for FailingStore {
    fn save_session(&mut self, _session: &Session) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    fn annotate_session(&mut self, _session: &Session) -> Result<(), StoreError> {
        Err(StoreError::Closed)
    }
}

struct UnknownDevice;

impl CapacityProvider for UnknownDevice {
    fn capacity(&self) -> Result<CapacityInput, CapacityError> {
        Err(CapacityError::Unavailable("no lookup entry".to_string()))
    }
}

fn battery(state: ChargeState, level: f64) -> ControllerEvent {
    ControllerEvent::BatteryChanged { state, level }
}

#[test]
fn full_session_is_handed_to_store() {
    let mut controller =
        SessionController::new(EstimatorConfig::default(), capacity(), RecordingStore::default());

    controller.handle(battery(ChargeState::Charging, 0.40), at(0));
    for (i, level) in [0.40, 0.41, 0.42, 0.43].into_iter().enumerate() {
        controller.handle(ControllerEvent::Tick { level }, at(i as i64 * 30));
    }
    controller.set_charger_label("Wall 30W", at(95));
    let outcome = controller.handle(battery(ChargeState::Unplugged, 0.43), at(100));

    assert!(outcome.store_error.is_none());
    assert!(!controller.state().is_charging_active());
    assert!(controller.current_session().is_none());

    let store = controller.store();
    assert_eq!(store.saved.len(), 1);
    assert_eq!(store.annotated.len(), 1);

    let session = &store.saved[0];
    assert_eq!(session.start_time, at(0));
    assert_eq!(session.end_time, Some(at(100)));
    assert_eq!(session.charger_label.as_deref(), Some("Wall 30W"));
    assert!((session.delta_percent - 3.0).abs() < 1e-9);
    assert!(session.peak_watts + 1e-9 >= session.average_watts);
    assert!(session.average_watts > 0.0);
}

#[test]
fn persistence_failure_does_not_block_stop() {
    let mut controller = SessionController::new(EstimatorConfig::default(), capacity(), FailingStore);

    controller.handle(battery(ChargeState::Charging, 0.70), at(0));
    controller.handle(ControllerEvent::Tick { level: 0.70 }, at(0));
    controller.handle(ControllerEvent::Tick { level: 0.68 }, at(5));

    let outcome = controller.stop_session(at(10));

    assert!(matches!(outcome.store_error, Some(StoreError::Backend(_))));
    assert!(!controller.state().is_charging_active());
    let finalized = outcome.finalized().unwrap();
    assert!((finalized.delta_percent - -2.0).abs() < 1e-9);
    assert_eq!(
        outcome.effects.first(),
        Some(&Effect::StopSampling),
        "timer must be cancelled even when the store fails"
    );
}

#[test]
fn restart_after_stop_resets_session_state() {
    let mut controller = SessionController::new(EstimatorConfig::default(), capacity(), NullStore);

    controller.handle(battery(ChargeState::Charging, 0.20), at(0));
    controller.handle(ControllerEvent::Tick { level: 0.20 }, at(0));
    controller.handle(ControllerEvent::Tick { level: 0.25 }, at(60));
    let first_id = controller.current_session().unwrap().id;
    controller.stop_session(at(65));

    let outcome = controller.start_session(at(70));

    let active = controller.state().active().unwrap();
    assert_ne!(active.session().id, first_id);
    assert!(active.buffer().is_empty());
    assert_eq!(active.estimator().smoothed(), None);
    assert_eq!(active.session().peak_watts, 0.0);

    let snapshot = outcome.snapshot().unwrap();
    assert_eq!(snapshot.current_watts, 0.0);
    assert_eq!(snapshot.peak_watts, 0.0);
    assert_eq!(snapshot.session_duration, Duration::ZERO);
}

#[test]
fn unknown_capacity_uses_fallback() {
    let mut controller =
        SessionController::new(EstimatorConfig::default(), UnknownDevice, NullStore);

    controller.handle(battery(ChargeState::Charging, 0.50), at(0));
    controller.handle(ControllerEvent::Tick { level: 0.50 }, at(0));
    let outcome = controller.handle(ControllerEvent::Tick { level: 0.51 }, at(60));

    let snapshot = outcome.snapshot().unwrap();
    let expected = instant_watts(
        &Sample::new(at(0), 0.50),
        &Sample::new(at(60), 0.51),
        &CapacityInput::fallback(),
    )
    .unwrap();
    assert!((snapshot.current_watts - expected).abs() < 1e-9);
}

#[test]
fn snapshot_serializes_durations_as_seconds() {
    let snapshot = MetricsSnapshot {
        session_id: None,
        is_charging: true,
        battery_level: 0.5,
        current_watts: 6.5,
        peak_watts: 7.0,
        average_watts: 6.0,
        session_duration: Duration::from_secs(120),
        eta_to_full: Duration::from_millis(1500),
    };

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["session_duration"], 120.0);
    assert_eq!(json["eta_to_full"], 1.5);

    let back: MetricsSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(back, snapshot);
}

#[test]
fn label_failure_is_reported_but_kept_in_memory() {
    let mut controller = SessionController::new(EstimatorConfig::default(), capacity(), FailingStore);
    controller.handle(battery(ChargeState::Charging, 0.30), at(0));

    let outcome = controller.set_notes("overnight", at(1));

    assert!(matches!(outcome.store_error, Some(StoreError::Closed)));
    assert_eq!(
        controller.current_session().unwrap().notes.as_deref(),
        Some("overnight")
    );
}
