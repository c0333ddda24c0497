//! Charging session state machine.
//!
//! The transition logic lives in [`transition`], a pure function from the
//! current state and one event to the next state plus a list of effects.
//! [`SessionController`] wraps it with the injected capacity provider and
//! session store, and executes the store effects.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::buffer::SampleBuffer;
use crate::config::{BackgroundPolicy, EstimatorConfig};
use crate::error::StoreError;
use crate::estimator::PowerEstimator;
use crate::eta;
use crate::provider::{resolve_capacity, CapacityProvider, SessionStore};
use crate::session::{MetricsSnapshot, Session};
use crate::types::{CapacityInput, ChargeState, Sample};

/// Inputs delivered to the controller, one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Battery observer update (also used for the initial snapshot).
    BatteryChanged { state: ChargeState, level: f64 },
    /// Sampling timer fired; `level` is the current authoritative level.
    Tick { level: f64 },
    EnteredBackground,
    EnteredForeground,
    StartSession,
    StopSession,
    SetChargerLabel(String),
    SetNotes(String),
}

/// Work the host must carry out after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start the periodic sampling timer at the given cadence.
    StartSampling(Duration),
    /// Cancel the sampling timer. No tick may be delivered afterwards.
    StopSampling,
    Publish(MetricsSnapshot),
    /// Hand a finalized session to the store.
    Persist(Session),
    /// Forward label/notes changes on the open session to the store.
    Annotate(Session),
}

/// Per-step environment for [`transition`].
#[derive(Debug, Clone)]
pub struct StepContext<'a> {
    pub now: DateTime<Utc>,
    pub capacity: CapacityInput,
    pub config: &'a EstimatorConfig,
    /// Id assigned if this step opens a session.
    pub session_id: Uuid,
}

/// Everything owned by an open session.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    session: Session,
    buffer: SampleBuffer,
    estimator: PowerEstimator,
    readings: Vec<f64>,
    first_level: Option<f64>,
    sampling: bool,
}

impl ActiveSession {
    fn new(session: Session, config: &EstimatorConfig) -> Self {
        Self {
            session,
            buffer: SampleBuffer::new(config.window()),
            estimator: PowerEstimator::new(config.smoothing_alpha),
            readings: Vec::new(),
            first_level: None,
            sampling: true,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn estimator(&self) -> &PowerEstimator {
        &self.estimator
    }

    /// False while paused in the background.
    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    fn average_watts(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        self.readings.iter().sum::<f64>() / self.readings.len() as f64
    }

    fn record_tick(&mut self, now: DateTime<Utc>, level: f64, capacity: &CapacityInput) {
        if !self.buffer.append(Sample::new(now, level)) {
            // Clock stepped backwards; the old window can never be extended.
            warn!(
                session_id = %self.session.id,
                newest = ?self.buffer.newest().map(|s| s.timestamp),
                now = %now,
                "Sample time went backwards, restarting window"
            );
            self.buffer.clear();
            self.buffer.append(Sample::new(now, level));
        }
        self.buffer.prune(now);
        if self.first_level.is_none() {
            self.first_level = Some(level);
        }

        if let Some(watts) = self.estimator.update(&self.buffer, capacity) {
            self.session.peak_watts = self.session.peak_watts.max(watts);
            if level > 0.0 {
                self.readings.push(watts);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Phase {
    #[default]
    Idle,
    Charging(Box<ActiveSession>),
}

/// Controller state: the session phase plus the last observed device state.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    phase: Phase,
    battery_state: ChargeState,
    level: f64,
    in_background: bool,
}

impl ControllerState {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match &self.phase {
            Phase::Charging(active) => Some(active),
            Phase::Idle => None,
        }
    }

    pub fn is_charging_active(&self) -> bool {
        matches!(self.phase, Phase::Charging(_))
    }

    pub fn battery_state(&self) -> ChargeState {
        self.battery_state
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Builds the published metrics for the current state.
    pub fn snapshot(&self, now: DateTime<Utc>, capacity: &CapacityInput) -> MetricsSnapshot {
        match &self.phase {
            Phase::Idle => MetricsSnapshot {
                battery_level: self.level,
                ..Default::default()
            },
            Phase::Charging(active) => {
                let current_watts = active.estimator.smoothed().unwrap_or(0.0);
                MetricsSnapshot {
                    session_id: Some(active.session.id),
                    is_charging: true,
                    battery_level: self.level,
                    current_watts,
                    peak_watts: active.session.peak_watts,
                    average_watts: active.average_watts(),
                    session_duration: active.session.duration(now),
                    eta_to_full: eta::project(self.level, current_watts, capacity),
                }
            }
        }
    }

    fn start(&mut self, ctx: &StepContext<'_>, effects: &mut Vec<Effect>) {
        let session = Session::open(ctx.session_id, ctx.now);
        self.phase = Phase::Charging(Box::new(ActiveSession::new(session, ctx.config)));
        effects.push(Effect::StartSampling(ctx.config.sample_interval()));
    }

    fn stop(&mut self, ctx: &StepContext<'_>, effects: &mut Vec<Effect>) {
        let Phase::Charging(active) = std::mem::take(&mut self.phase) else {
            return;
        };

        if active.sampling {
            effects.push(Effect::StopSampling);
        }

        let average = active.average_watts();
        let delta_percent = active
            .first_level
            .map(|first| (self.level - first) * 100.0)
            .unwrap_or(0.0);

        let mut session = active.session;
        session.finalize(ctx.now, average, delta_percent);
        effects.push(Effect::Persist(session));
    }
}

/// Applies one event to the state.
///
/// Never performs I/O. Store work and timer changes are returned as effects,
/// in the order the host must apply them.
pub fn transition(
    mut state: ControllerState,
    event: ControllerEvent,
    ctx: &StepContext<'_>,
) -> (ControllerState, Vec<Effect>) {
    let mut effects = Vec::new();

    match event {
        ControllerEvent::BatteryChanged {
            state: charge,
            level,
        } => {
            let was_charging = state.battery_state.is_charging();
            state.battery_state = charge;
            state.level = level;

            if charge.is_charging() {
                if !was_charging && !state.in_background && !state.is_charging_active() {
                    state.start(ctx, &mut effects);
                }
            } else if state.is_charging_active() {
                state.stop(ctx, &mut effects);
            }
        }
        ControllerEvent::Tick { level } => {
            let Phase::Charging(active) = &mut state.phase else {
                return (state, effects);
            };
            if !active.sampling {
                return (state, effects);
            }
            state.level = level;
            active.record_tick(ctx.now, level, &ctx.capacity);
        }
        ControllerEvent::EnteredBackground => {
            state.in_background = true;
            match ctx.config.background_policy {
                BackgroundPolicy::TerminateAndRestart => state.stop(ctx, &mut effects),
                BackgroundPolicy::PauseAndResume => {
                    if let Phase::Charging(active) = &mut state.phase {
                        if active.sampling {
                            active.sampling = false;
                            effects.push(Effect::StopSampling);
                        }
                    }
                }
            }
        }
        ControllerEvent::EnteredForeground => {
            state.in_background = false;
            let charging = state.battery_state.is_charging();
            match &mut state.phase {
                Phase::Charging(active) if !active.sampling => {
                    active.sampling = true;
                    effects.push(Effect::StartSampling(ctx.config.sample_interval()));
                }
                Phase::Charging(_) => {}
                Phase::Idle if charging => state.start(ctx, &mut effects),
                Phase::Idle => {}
            }
        }
        ControllerEvent::StartSession => {
            if state.is_charging_active() {
                return (state, effects);
            }
            state.start(ctx, &mut effects);
        }
        ControllerEvent::StopSession => {
            if !state.is_charging_active() {
                return (state, effects);
            }
            state.stop(ctx, &mut effects);
        }
        ControllerEvent::SetChargerLabel(text) => {
            let Phase::Charging(active) = &mut state.phase else {
                return (state, effects);
            };
            active.session.charger_label = non_empty(text);
            effects.push(Effect::Annotate(active.session.clone()));
            return (state, effects);
        }
        ControllerEvent::SetNotes(text) => {
            let Phase::Charging(active) = &mut state.phase else {
                return (state, effects);
            };
            active.session.notes = non_empty(text);
            effects.push(Effect::Annotate(active.session.clone()));
            return (state, effects);
        }
    }

    effects.push(Effect::Publish(state.snapshot(ctx.now, &ctx.capacity)));
    (state, effects)
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Result of one [`SessionController::handle`] call.
#[derive(Debug, Default)]
pub struct StepOutcome {
    pub effects: Vec<Effect>,
    /// Set when the store rejected a save or annotation. The transition has
    /// already been applied regardless.
    pub store_error: Option<StoreError>,
}

impl StepOutcome {
    /// The snapshot published by this step, if any.
    pub fn snapshot(&self) -> Option<&MetricsSnapshot> {
        self.effects.iter().rev().find_map(|e| match e {
            Effect::Publish(snapshot) => Some(snapshot),
            _ => None,
        })
    }

    /// The session finalized by this step, if any.
    pub fn finalized(&self) -> Option<&Session> {
        self.effects.iter().find_map(|e| match e {
            Effect::Persist(session) => Some(session),
            _ => None,
        })
    }
}

/// Owns the controller state and its injected collaborators.
pub struct SessionController<P, S> {
    state: ControllerState,
    config: EstimatorConfig,
    capacity: P,
    store: S,
    warned_fallback: bool,
}

impl<P: CapacityProvider, S: SessionStore> SessionController<P, S> {
    pub fn new(config: EstimatorConfig, capacity: P, store: S) -> Self {
        Self {
            state: ControllerState::default(),
            config,
            capacity,
            store,
            warned_fallback: false,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.state.active().map(ActiveSession::session)
    }

    /// Latest metrics without advancing the state machine.
    pub fn snapshot(&mut self, now: DateTime<Utc>) -> MetricsSnapshot {
        let capacity = self.capacity();
        self.state.snapshot(now, &capacity)
    }

    /// Feeds one event through the state machine and applies store effects.
    pub fn handle(&mut self, event: ControllerEvent, now: DateTime<Utc>) -> StepOutcome {
        let capacity = self.capacity();
        let ctx = StepContext {
            now,
            capacity,
            config: &self.config,
            session_id: Uuid::new_v4(),
        };

        let state = std::mem::take(&mut self.state);
        let (next, effects) = transition(state, event, &ctx);
        self.state = next;

        let mut store_error = None;
        for effect in &effects {
            match effect {
                Effect::StartSampling(_) => {
                    if let Some(session) = self.current_session() {
                        info!(session_id = %session.id, "Charging session started");
                    }
                }
                Effect::Persist(session) => {
                    info!(
                        session_id = %session.id,
                        average_watts = session.average_watts,
                        peak_watts = session.peak_watts,
                        delta_percent = session.delta_percent,
                        "Charging session finished"
                    );
                    if let Err(e) = self.store.save_session(session) {
                        error!(session_id = %session.id, error = %e, "Failed to persist session");
                        store_error = Some(e);
                    }
                }
                Effect::Annotate(session) => {
                    if let Err(e) = self.store.annotate_session(session) {
                        warn!(session_id = %session.id, error = %e, "Failed to annotate session");
                        store_error = Some(e);
                    }
                }
                Effect::Publish(snapshot) => {
                    debug!(
                        watts = snapshot.current_watts,
                        peak = snapshot.peak_watts,
                        level = snapshot.battery_level,
                        eta_secs = snapshot.eta_to_full.as_secs(),
                        "Published metrics"
                    );
                }
                Effect::StopSampling => {}
            }
        }

        StepOutcome {
            effects,
            store_error,
        }
    }

    pub fn start_session(&mut self, now: DateTime<Utc>) -> StepOutcome {
        self.handle(ControllerEvent::StartSession, now)
    }

    pub fn stop_session(&mut self, now: DateTime<Utc>) -> StepOutcome {
        self.handle(ControllerEvent::StopSession, now)
    }

    pub fn set_charger_label(&mut self, text: impl Into<String>, now: DateTime<Utc>) -> StepOutcome {
        self.handle(ControllerEvent::SetChargerLabel(text.into()), now)
    }

    pub fn set_notes(&mut self, text: impl Into<String>, now: DateTime<Utc>) -> StepOutcome {
        self.handle(ControllerEvent::SetNotes(text.into()), now)
    }

    fn capacity(&mut self) -> CapacityInput {
        let (capacity, err) = resolve_capacity(&self.capacity);
        match err {
            Some(e) => {
                if !self.warned_fallback {
                    warn!(
                        error = %e,
                        fallback_mah = capacity.milliamp_hours,
                        "Device capacity unknown, using fallback"
                    );
                    self.warned_fallback = true;
                }
            }
            None => self.warned_fallback = false,
        }
        capacity
    }
}
