//! The `monitor` runtime.
//!
//! A single-threaded tokio loop owns the [`SessionController`] and feeds it
//! one event at a time: sampling ticks, battery polls, stdin commands and
//! lifecycle signals. The sampling interval only exists between a
//! `StartSampling` and the matching `StopSampling` effect.

mod input;
mod output;

use std::future::pending;
use std::time::Duration;

use chrono::Utc;
use color_eyre::eyre::{Result, WrapErr};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use trickle_core::{
    CapacityProvider, ControllerEvent, Effect, NullStore, SessionController, SessionStore,
    StepOutcome,
};

use trickle_platform::{BatteryProvider, SystemBattery};

use crate::config::UserConfig;
use crate::data::{BatteryData, SqliteSessionStore};

use input::Command;
pub use output::{format_elapsed, short_id, Output};

type Controller = SessionController<Box<dyn CapacityProvider>, Box<dyn SessionStore>>;

pub struct MonitorOptions {
    pub json: bool,
    pub store: bool,
}

pub fn run(config: UserConfig, options: MonitorOptions) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, run_async(config, options))
}

struct Monitor<B: BatteryProvider = SystemBattery> {
    controller: Controller,
    battery: BatteryData<B>,
    output: Output,
    sampler: Option<Interval>,
}

impl Monitor<SystemBattery> {
    fn new(config: &UserConfig, options: &MonitorOptions) -> Result<Self> {
        let battery = BatteryData::new().wrap_err("No battery found on this system")?;
        let capacity = battery.capacity_provider(config);
        let store = open_store(config, options);
        let controller = SessionController::new(config.estimator.clone(), capacity, store);

        Ok(Self::with_parts(
            controller,
            battery,
            Output { json: options.json },
        ))
    }
}

impl<B: BatteryProvider> Monitor<B> {
    fn with_parts(controller: Controller, battery: BatteryData<B>, output: Output) -> Self {
        Self {
            controller,
            battery,
            output,
            sampler: None,
        }
    }

    fn dispatch(&mut self, event: ControllerEvent) {
        debug!(event = ?event, "Dispatching");
        let outcome = self.controller.handle(event, Utc::now());
        self.apply(outcome);
    }

    fn apply(&mut self, outcome: StepOutcome) {
        for effect in outcome.effects {
            match effect {
                Effect::StartSampling(period) => self.start_sampling(period),
                Effect::StopSampling => {
                    self.sampler = None;
                    debug!("Sampling stopped");
                }
                Effect::Publish(snapshot) => {
                    let state = self.controller.state().battery_state();
                    self.output.metrics(&snapshot, state);
                }
                Effect::Persist(session) => self.output.session_finished(&session),
                Effect::Annotate(_) => {}
            }
        }

        if let Some(e) = outcome.store_error {
            eprintln!("Warning: session was not saved: {e}");
        }
    }

    fn start_sampling(&mut self, period: Duration) {
        let mut interval = tokio::time::interval_at(Instant::now(), period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.sampler = Some(interval);
        debug!(period_secs = period.as_secs(), "Sampling started");
    }

    /// Refreshes the battery and reports any state change before the tick
    /// itself, so an unplug is seen before a stale level is sampled.
    fn on_sample_tick(&mut self) {
        self.on_battery_poll();
        if self.sampler.is_some() {
            let level = self.battery.level();
            self.dispatch(ControllerEvent::Tick { level });
        }
    }

    fn on_battery_poll(&mut self) {
        match self.battery.poll() {
            Ok(Some(event)) => self.dispatch(event),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Battery refresh failed"),
        }
    }

    /// Returns false when the monitor should exit.
    fn on_line(&mut self, line: &str) -> bool {
        match Command::parse(line) {
            Ok(Some(command)) => match command.into_event() {
                Some(event) => {
                    self.dispatch(event);
                    true
                }
                None => false,
            },
            Ok(None) => true,
            Err(e) => {
                eprintln!("{e}");
                true
            }
        }
    }

    fn shutdown(&mut self) {
        if self.controller.state().is_charging_active() {
            info!("Finalizing open session before exit");
            let outcome = self.controller.stop_session(Utc::now());
            self.apply(outcome);
        }
    }
}

fn open_store(config: &UserConfig, options: &MonitorOptions) -> Box<dyn SessionStore> {
    if !options.store || !config.store_sessions {
        debug!("Session storage disabled");
        return Box::new(NullStore);
    }

    match SqliteSessionStore::open() {
        Ok(store) => {
            match store.get_incomplete_sessions() {
                Ok(stale) if !stale.is_empty() => {
                    warn!(count = stale.len(), "Found sessions from earlier runs that never finished");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Could not check for unfinished sessions"),
            }
            Box::new(store)
        }
        Err(e) => {
            error!(error = %e, "Failed to open session database, sessions will not be saved");
            eprintln!("Warning: sessions will not be saved: {e}");
            Box::new(NullStore)
        }
    }
}

async fn next_tick(sampler: &mut Option<Interval>) {
    match sampler {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending::<()>().await,
    }
}

async fn read_stdin(tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Stopped reading stdin");
                break;
            }
        }
    }
}

async fn run_async(config: UserConfig, options: MonitorOptions) -> Result<()> {
    let mut monitor = Monitor::new(&config, &options)?;

    let battery = monitor.battery.info();
    info!(
        vendor = battery.vendor.as_deref().unwrap_or("unknown"),
        model = battery.model.as_deref().unwrap_or("unknown"),
        interval_secs = config.estimator.sample_interval_secs,
        window_secs = config.estimator.window_secs,
        policy = config.estimator.background_policy.label(),
        "Monitor starting"
    );

    let initial = monitor.battery.current_event();
    monitor.dispatch(initial);

    let mut poll_tick = tokio::time::interval(Duration::from_millis(config.battery_poll_ms.max(100)));
    poll_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    poll_tick.tick().await;

    let mut background = signal(SignalKind::user_defined1())?;
    let mut foreground = signal(SignalKind::user_defined2())?;

    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    tokio::task::spawn_local(read_stdin(line_tx));

    loop {
        tokio::select! {
            _ = next_tick(&mut monitor.sampler) => {
                monitor.on_sample_tick();
            }
            _ = poll_tick.tick() => {
                monitor.on_battery_poll();
            }
            Some(()) = background.recv() => {
                info!("Entered background");
                monitor.dispatch(ControllerEvent::EnteredBackground);
            }
            Some(()) = foreground.recv() => {
                info!("Entered foreground");
                monitor.dispatch(ControllerEvent::EnteredForeground);
            }
            Some(line) = line_rx.recv() => {
                if !monitor.on_line(&line) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    monitor.shutdown();
    info!("Monitor stopped");
    Ok(())
}
