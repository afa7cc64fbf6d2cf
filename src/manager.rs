//! High-level emulator manager
//!
//! Owns the worker threads that keep the translation running:
//!
//! - **event**: reads the device source, decides every event through the
//!   pipeline and drains pending decay ticks. Sole owner of the pipeline.
//! - **timer**: sends decay ticks at the configured interval.
//! - **sink-worker**: submits controller reports (see `backend::offload`).
//! - **status**: writes the mode status file, when one is configured.

use crate::backend::{ControllerSink, DeviceSource, OffloadedSink, RetryPolicy};
use crate::input::EngineEvent;
use crate::mapping::{Config, ConfigError, Diagnostics, ModeChange, Pipeline};
use crate::status;
use crate::thread_priority::{self, ThreadRole};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use log::{debug, error, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often the event thread logs loop statistics
const STATS_WINDOW: Duration = Duration::from_secs(2);

/// Pending ticks beyond this are dropped by the timer
const TICK_QUEUE: usize = 4;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Manager is already running")]
    AlreadyRunning,

    #[error("Manager was already started once; backends are consumed")]
    BackendsConsumed,

    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Manager for one device source driving one virtual controller
pub struct EmulatorManager<D, S>
where
    D: DeviceSource + Send + 'static,
    S: ControllerSink + Send + 'static,
{
    config: Config,
    source: Option<D>,
    sink: Option<S>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Mode change listeners registered before start
    subscribers: Vec<Sender<ModeChange>>,
    event_thread: Option<JoinHandle<Diagnostics>>,
    timer_thread: Option<JoinHandle<()>>,
    status_thread: Option<JoinHandle<()>>,
}

impl<D, S> EmulatorManager<D, S>
where
    D: DeviceSource + Send + 'static,
    S: ControllerSink + Send + 'static,
{
    /// Create a new manager
    pub fn new(config: Config, source: D, sink: S) -> Self {
        Self {
            config,
            source: Some(source),
            sink: Some(sink),
            running: Arc::new(AtomicBool::new(false)),
            subscribers: Vec::new(),
            event_thread: None,
            timer_thread: None,
            status_thread: None,
        }
    }

    /// Receive mode changes. Only subscriptions made before `start` count.
    pub fn subscribe_mode(&mut self) -> Receiver<ModeChange> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Start the manager - spawns the sink worker, timer and event threads
    pub fn start(&mut self) -> Result<(), ManagerError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(ManagerError::AlreadyRunning);
        }
        let (Some(source), Some(sink)) = (self.source.take(), self.sink.take()) else {
            return Err(ManagerError::BackendsConsumed);
        };

        info!("Starting emulator manager...");

        let settings = self.config.settings.clone();
        let policy = RetryPolicy {
            retries: settings.submit_retries,
            backoff: settings.submit_backoff(),
        };

        let sink = OffloadedSink::spawn(sink, policy)?;
        let mut pipeline = Pipeline::new(&self.config, sink)?;

        for tx in self.subscribers.drain(..) {
            pipeline.add_mode_subscriber(tx);
        }

        if let Some(file) = &settings.status_file {
            let path = status::resolve_status_path(file);
            let changes = pipeline.subscribe_mode();
            self.status_thread = Some(status::spawn_publisher(path, changes)?);
        }

        self.running.store(true, Ordering::SeqCst);

        let (tick_tx, tick_rx) = bounded(TICK_QUEUE);
        match self.start_timer_thread(tick_tx, settings.tick_interval()) {
            Ok(handle) => self.timer_thread = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        }

        let running = Arc::clone(&self.running);
        let poll_timeout = settings.poll_timeout();
        let spawned = thread::Builder::new()
            .name("event".to_string())
            .spawn(move || run_event_loop(source, pipeline, tick_rx, running, poll_timeout));

        match spawned {
            Ok(handle) => self.event_thread = Some(handle),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        }

        info!("✓ Manager started! Passing input through until the toggle key is pressed");
        Ok(())
    }

    /// Stop all threads. Returns the pipeline's final diagnostics.
    pub fn stop(&mut self) -> Option<Diagnostics> {
        if self.event_thread.is_none() {
            return None;
        }

        info!("Stopping emulator manager...");
        self.running.store(false, Ordering::SeqCst);

        let diagnostics = self.event_thread.take().and_then(|handle| match handle.join() {
            Ok(diagnostics) => Some(diagnostics),
            Err(_) => {
                error!("Event thread panicked");
                None
            }
        });

        for handle in [self.timer_thread.take(), self.status_thread.take()]
            .into_iter()
            .flatten()
        {
            if handle.join().is_err() {
                warn!("Worker thread panicked");
            }
        }

        info!("✓ Emulator manager stopped");
        diagnostics
    }

    /// Check if the manager is running. Turns false on its own if the
    /// device source fails.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn start_timer_thread(
        &self,
        ticks: Sender<Instant>,
        interval: Duration,
    ) -> io::Result<JoinHandle<()>> {
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("timer".to_string())
            .spawn(move || {
                thread_priority::apply(ThreadRole::Timer);
                debug!("Timer thread started ({:?} interval)", interval);

                while running.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    match ticks.try_send(Instant::now()) {
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }

                debug!("Timer thread exited");
            })
    }
}

/// Implement Drop to restore pass-through and release the controller
impl<D, S> Drop for EmulatorManager<D, S>
where
    D: DeviceSource + Send + 'static,
    S: ControllerSink + Send + 'static,
{
    fn drop(&mut self) {
        if self.event_thread.is_some() {
            info!("Shutting down emulator manager (Drop trait)...");
            self.stop();
        }
    }
}

/// Running event counts and handling latency for the periodic debug line
struct LoopStats {
    events: u32,
    busy: Duration,
    window_start: Instant,
}

impl LoopStats {
    fn new() -> Self {
        Self {
            events: 0,
            busy: Duration::ZERO,
            window_start: Instant::now(),
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.events += 1;
        self.busy += elapsed;
    }

    fn maybe_log(&mut self) {
        let window = self.window_start.elapsed();
        if window < STATS_WINDOW {
            return;
        }

        if self.events > 0 {
            debug!(
                "{} events, {:.1} per sec, avg = {:?}",
                self.events,
                self.events as f64 / window.as_secs_f64(),
                self.busy / self.events
            );
        }

        *self = Self::new();
    }
}

fn run_event_loop<D, S>(
    mut source: D,
    mut pipeline: Pipeline<S>,
    ticks: Receiver<Instant>,
    running: Arc<AtomicBool>,
    poll_timeout: Duration,
) -> Diagnostics
where
    D: DeviceSource,
    S: ControllerSink,
{
    thread_priority::apply(ThreadRole::Input);
    info!("Event thread started");

    let mut stats = LoopStats::new();

    while running.load(Ordering::SeqCst) {
        match source.next_event(poll_timeout) {
            Ok(Some(event)) => {
                let started = Instant::now();
                let suppress = pipeline.process(&EngineEvent::Input(event));
                if let Err(e) = source.set_suppressed(&event, suppress) {
                    warn!("Failed to apply suppress decision: {}", e);
                }
                stats.record(started.elapsed());
            }
            Ok(None) => {}
            Err(e) => {
                error!("Device source failed, stopping: {}", e);
                break;
            }
        }

        // Stale ticks carry no information beyond the newest one
        if let Some(at) = ticks.try_iter().last() {
            pipeline.process(&EngineEvent::Tick { at });
        }

        stats.maybe_log();
    }

    running.store(false, Ordering::SeqCst);

    if let Err(e) = source.release_pending() {
        warn!("Failed to release pending input: {}", e);
    }
    pipeline.shutdown();

    info!("Event thread exited");
    pipeline.diagnostics().clone()
}
