//! Event pipeline - engine, mode and controller sink wired together
//!
//! `Pipeline::process` is the single entry point the event thread calls for
//! every raw event and timer tick. It never fails: sink errors become
//! diagnostics, and a sink that keeps failing pushes the mode back to
//! pass-through so physical input is not swallowed without any controller
//! output to show for it.

use crate::backend::{BackendError, ControllerSink};
use crate::gamepad::ControllerState;
use crate::input::EngineEvent;
use crate::mapping::config::{Config, ConfigError};
use crate::mapping::engine::TranslationEngine;
use crate::mapping::mode::{ControllerMode, ModeChange, ModeChangeCause, ModeController};
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, trace, warn};

/// Counters describing what the pipeline has done so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Raw events processed
    pub events: u64,
    pub suppressed: u64,
    pub ticks: u64,
    /// Snapshots accepted by the sink
    pub submissions: u64,
    pub submit_failures: u64,
    /// Emulation-mode events with no binding
    pub unmapped_events: u64,
    /// Times a failing sink forced pass-through
    pub fallbacks: u64,
    pub last_fallback_reason: Option<String>,
}

/// Consecutive submission failure tracking
#[derive(Debug, Clone)]
struct SinkHealth {
    consecutive_failures: u32,
    max_failures: u32,
}

impl SinkHealth {
    fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Returns true once the failure budget is exhausted
    fn record_failure(&mut self) -> bool {
        self.consecutive_failures += 1;
        self.consecutive_failures >= self.max_failures
    }
}

pub struct Pipeline<S: ControllerSink> {
    engine: TranslationEngine,
    mode: ModeController,
    sink: S,
    health: SinkHealth,
    diagnostics: Diagnostics,
}

impl<S: ControllerSink> Pipeline<S> {
    /// Build a pipeline for a validated profile
    pub fn new(config: &Config, sink: S) -> Result<Self, ConfigError> {
        let toggle_key = config.toggle_key().ok_or_else(|| {
            ConfigError::Invalid("profile has no toggle key bind".into())
        })?;

        info!("Toggle key: {}", toggle_key);

        Ok(Self {
            engine: TranslationEngine::new(config),
            mode: ModeController::new(toggle_key),
            sink,
            health: SinkHealth {
                consecutive_failures: 0,
                max_failures: config.settings.max_submit_failures,
            },
            diagnostics: Diagnostics::default(),
        })
    }

    /// Handle one event and return whether its hardware event is suppressed
    pub fn process(&mut self, event: &EngineEvent) -> bool {
        let decision = self.engine.handle(&mut self.mode, event);

        match event {
            EngineEvent::Input(_) => {
                self.diagnostics.events += 1;
                if decision.suppress {
                    self.diagnostics.suppressed += 1;
                }
                if decision.unmapped {
                    self.diagnostics.unmapped_events += 1;
                }
            }
            EngineEvent::Tick { .. } => self.diagnostics.ticks += 1,
        }

        if let Some(state) = decision.submit {
            self.submit(&state);
        }

        decision.suppress
    }

    /// Restore pass-through, park the controller at rest and release the sink
    pub fn shutdown(&mut self) {
        info!("Shutting down pipeline...");
        self.engine.enter_passthrough(&mut self.mode, ModeChangeCause::Shutdown);

        if let Err(e) = self.sink.submit(&ControllerState::neutral()) {
            warn!("Failed to submit rest state on shutdown: {}", e);
        }
        if let Err(e) = self.sink.close() {
            warn!("Failed to release virtual controller: {}", e);
        }

        info!("Pipeline stopped: {:?}", self.diagnostics);
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode.mode()
    }

    pub fn state(&self) -> ControllerState {
        self.engine.state()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn subscribe_mode(&mut self) -> Receiver<ModeChange> {
        self.mode.subscribe()
    }

    pub fn add_mode_subscriber(&mut self, tx: Sender<ModeChange>) {
        self.mode.add_subscriber(tx);
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn submit(&mut self, state: &ControllerState) {
        let outcomes = self.sink.submit_outcomes(state);
        if outcomes.is_empty() {
            trace!("No report outcome known yet");
        }

        for outcome in outcomes {
            match outcome {
                Ok(()) => {
                    self.health.record_success();
                    self.diagnostics.submissions += 1;
                }
                Err(e) => {
                    self.diagnostics.submit_failures += 1;
                    warn!(
                        "Controller report failed ({}/{}): {}",
                        self.health.consecutive_failures + 1,
                        self.health.max_failures,
                        e
                    );
                    if self.health.record_failure() {
                        self.fall_back(e);
                        return;
                    }
                }
            }
        }
    }

    /// Too many failed submissions: stop consuming input
    fn fall_back(&mut self, last_error: BackendError) {
        let reason = format!(
            "controller sink failed {} times in a row: {}",
            self.health.consecutive_failures, last_error
        );
        error!("Falling back to pass-through: {}", reason);

        self.health.record_success();
        self.diagnostics.fallbacks += 1;
        self.diagnostics.last_fallback_reason = Some(reason.clone());

        let cause = ModeChangeCause::SinkFailure(reason);
        if let Some(rest) = self.engine.enter_passthrough(&mut self.mode, cause) {
            // Best effort, the sink is known to be unhealthy
            if let Err(e) = self.sink.submit(&rest) {
                debug!("Rest state after fallback not delivered: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockSink;
    use crate::input::RawInputEvent;

    const GRAVE: u8 = 0x29;
    const W: u8 = 0x11;

    fn pipeline(sink: MockSink) -> Pipeline<MockSink> {
        let config = Config::from_toml_str(r#"
            [settings]
            max_submit_failures = 3

            [binds]
            grave = { type = "toggle" }
            w = { type = "direction", stick = "left", direction = "up" }
        "#).unwrap();
        Pipeline::new(&config, sink).unwrap()
    }

    fn key(code: u8, pressed: bool) -> EngineEvent {
        EngineEvent::Input(RawInputEvent::key(code, pressed))
    }

    #[test]
    fn counts_events() {
        let sink = MockSink::new();
        let mut p = pipeline(sink.clone());
        p.process(&key(W, true));
        p.process(&key(GRAVE, true));
        p.process(&key(0x56, true));
        p.process(&EngineEvent::Tick { at: std::time::Instant::now() });

        let d = p.diagnostics();
        assert_eq!(d.events, 3);
        assert_eq!(d.suppressed, 2);
        assert_eq!(d.unmapped_events, 1);
        assert_eq!(d.ticks, 1);
    }

    #[test]
    fn success_resets_failure_streak() {
        let sink = MockSink::new();
        let mut p = pipeline(sink.clone());
        p.process(&key(GRAVE, true));

        sink.fail_next(2);
        p.process(&key(W, true));
        p.process(&key(W, false));
        p.process(&key(W, true));
        assert_eq!(p.mode(), ControllerMode::Emulation);
        assert_eq!(p.diagnostics().submit_failures, 2);
        assert_eq!(p.diagnostics().fallbacks, 0);
    }

    /// Reports several outcomes per call, or none, like a sink that
    /// learns about failures after the fact
    struct LateSink {
        calls: u32,
    }

    impl ControllerSink for LateSink {
        fn submit(&mut self, _state: &ControllerState) -> Result<(), BackendError> {
            Err(BackendError::Submit("late".into()))
        }

        fn submit_outcomes(&mut self, _state: &ControllerState) -> Vec<Result<(), BackendError>> {
            self.calls += 1;
            if self.calls % 2 == 1 {
                Vec::new()
            } else {
                vec![Err(BackendError::Submit("late".into())), Err(BackendError::Submit("late".into()))]
            }
        }
    }

    #[test]
    fn calls_without_outcome_keep_failure_streak() {
        let config = Config::from_toml_str(r#"
            [settings]
            max_submit_failures = 3

            [binds]
            grave = { type = "toggle" }
            w = { type = "direction", stick = "left", direction = "up" }
        "#).unwrap();
        let mut p = Pipeline::new(&config, LateSink { calls: 0 }).unwrap();
        p.process(&key(GRAVE, true));

        p.process(&key(W, true));
        p.process(&key(W, false));
        assert_eq!(p.diagnostics().submit_failures, 2);
        assert_eq!(p.mode(), ControllerMode::Emulation);

        p.process(&key(W, true));
        p.process(&key(W, false));
        assert_eq!(p.diagnostics().fallbacks, 1);
        assert_eq!(p.diagnostics().submit_failures, 3);
        assert_eq!(p.mode(), ControllerMode::Passthrough);
    }

    #[test]
    fn shutdown_parks_controller() {
        let sink = MockSink::new();
        let mut p = pipeline(sink.clone());
        p.process(&key(GRAVE, true));
        p.process(&key(W, true));

        p.shutdown();
        assert_eq!(p.mode(), ControllerMode::Passthrough);
        assert_eq!(sink.last(), Some(ControllerState::neutral()));
        assert!(sink.is_closed());
    }

    #[test]
    fn missing_toggle_is_rejected() {
        let mut config = Config::from_toml_str(r#"
            [binds]
            grave = { type = "toggle" }
        "#).unwrap();
        config.binds.clear();
        assert!(Pipeline::new(&config, MockSink::new()).is_err());
    }
}
