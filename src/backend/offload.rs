//! Controller reports off the event thread
//!
//! `OffloadedSink` hands every snapshot to a worker thread and returns at
//! once. The worker coalesces whatever queued up while it was busy down to
//! the newest snapshot, submits it with bounded retry, and reports the
//! outcome back. A failure therefore surfaces on a *later* call, and a call
//! that finds no outcome waiting knows nothing yet.

use super::{BackendError, ControllerSink};
use crate::gamepad::ControllerState;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace, warn};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Extra attempts per snapshot and the first pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    /// Doubled after every failed attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(1),
        }
    }
}

enum Command {
    Submit(ControllerState),
    Close,
}

pub struct OffloadedSink {
    commands: Sender<Command>,
    outcomes: Receiver<Result<(), BackendError>>,
    worker: Option<JoinHandle<Result<(), BackendError>>>,
}

impl OffloadedSink {
    /// Move `sink` onto its own worker thread
    pub fn spawn<S>(sink: S, policy: RetryPolicy) -> io::Result<Self>
    where
        S: ControllerSink + Send + 'static,
    {
        let (commands, command_rx) = unbounded();
        let (outcome_tx, outcomes) = unbounded();

        let worker = thread::Builder::new()
            .name("sink-worker".into())
            .spawn(move || run_worker(sink, policy, command_rx, outcome_tx))?;

        Ok(Self {
            commands,
            outcomes,
            worker: Some(worker),
        })
    }

    /// Flush the last snapshot, release the wrapped sink and join the worker
    fn shut_down(&mut self) -> Result<(), BackendError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        // A dead worker has already dropped its receiver
        let _ = self.commands.send(Command::Close);

        match worker.join() {
            Ok(result) => result,
            Err(_) => Err(BackendError::Submit("sink worker panicked".into())),
        }
    }
}

impl ControllerSink for OffloadedSink {
    /// Fails if any outcome reported since the previous call was a failure
    fn submit(&mut self, state: &ControllerState) -> Result<(), BackendError> {
        self.submit_outcomes(state).into_iter().collect()
    }

    fn submit_outcomes(&mut self, state: &ControllerState) -> Vec<Result<(), BackendError>> {
        if self.worker.is_none() {
            return vec![Err(BackendError::Submit("sink worker already stopped".into()))];
        }

        if self.commands.send(Command::Submit(*state)).is_err() {
            return vec![Err(BackendError::Submit("sink worker exited".into()))];
        }

        // Outcomes of earlier reports; this one's arrives later
        self.outcomes.try_iter().collect()
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.shut_down()
    }
}

impl Drop for OffloadedSink {
    fn drop(&mut self) {
        if let Err(e) = self.shut_down() {
            warn!("Sink worker did not shut down cleanly: {}", e);
        }
    }
}

fn run_worker<S: ControllerSink>(
    mut sink: S,
    policy: RetryPolicy,
    commands: Receiver<Command>,
    outcomes: Sender<Result<(), BackendError>>,
) -> Result<(), BackendError> {
    debug!("Sink worker started");

    while let Ok(first) = commands.recv() {
        let mut latest = None;
        let mut closing = false;
        let mut skipped = 0u32;

        for command in std::iter::once(first).chain(commands.try_iter()) {
            match command {
                Command::Submit(state) => {
                    if latest.replace(state).is_some() {
                        skipped += 1;
                    }
                }
                Command::Close => closing = true,
            }
        }

        if skipped > 0 {
            trace!("Coalesced {} stale snapshots", skipped);
        }

        if let Some(state) = latest {
            let result = submit_with_retry(&mut sink, &state, policy);
            // Nobody listening any more is fine during shutdown
            let _ = outcomes.send(result);
        }

        if closing {
            break;
        }
    }

    debug!("Sink worker stopping");
    sink.close()
}

fn submit_with_retry<S: ControllerSink>(
    sink: &mut S,
    state: &ControllerState,
    policy: RetryPolicy,
) -> Result<(), BackendError> {
    let mut backoff = policy.backoff;
    let mut attempt = 0;

    loop {
        match sink.submit(state) {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= policy.retries => return Err(e),
            Err(e) => {
                attempt += 1;
                debug!("Report attempt {} failed, retrying in {:?}: {}", attempt, backoff, e);
                thread::sleep(backoff);
                backoff = backoff.saturating_mul(2);
            }
        }
    }
}
