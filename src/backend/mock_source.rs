//! Mock device source for testing.
//!
//! Replays a scripted queue of events instead of reading the interception
//! driver, and records every suppress decision so tests can check what would
//! have reached the OS.

use super::{BackendError, DeviceSource};
use crate::input::RawInputEvent;
use log::info;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

#[derive(Debug, Default)]
struct SourceState {
    queue: VecDeque<RawInputEvent>,
    /// Last event handed out, still waiting for its decision
    pending: Option<RawInputEvent>,
    decisions: Vec<(RawInputEvent, bool)>,
}

/// Mock source that replays queued events. Clones share one queue.
#[derive(Clone, Debug, Default)]
pub struct MockSource {
    state: Arc<Mutex<SourceState>>,
}

impl MockSource {
    /// Create an empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source preloaded with events.
    pub fn with_events<I: IntoIterator<Item = RawInputEvent>>(events: I) -> Self {
        let source = Self::new();
        for event in events {
            source.push(event);
        }
        source
    }

    /// Queue an event for a later `next_event`.
    pub fn push(&self, event: RawInputEvent) {
        self.lock().queue.push_back(event);
    }

    /// Every decision made so far, in order.
    pub fn decisions(&self) -> Vec<(RawInputEvent, bool)> {
        self.lock().decisions.clone()
    }

    /// Events not yet handed out.
    pub fn remaining(&self) -> usize {
        self.lock().queue.len()
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceSource for MockSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>, BackendError> {
        {
            let mut state = self.lock();
            if state.pending.is_some() {
                return Err(BackendError::Undecided);
            }
            if let Some(event) = state.queue.pop_front() {
                state.pending = Some(event);
                return Ok(Some(event));
            }
        }

        // Behave like a driver wait that timed out
        thread::sleep(timeout);
        Ok(None)
    }

    fn set_suppressed(&mut self, event: &RawInputEvent, suppress: bool) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.pending = None;
        state.decisions.push((*event, suppress));
        info!(
            "[MOCK SOURCE] {:?} -> {}",
            event.kind,
            if suppress { "suppressed" } else { "passed" }
        );
        Ok(())
    }

    fn release_pending(&mut self) -> Result<(), BackendError> {
        let mut state = self.lock();
        if let Some(event) = state.pending.take() {
            info!("[MOCK SOURCE] {:?} -> released", event.kind);
            state.decisions.push((event, false));
        }
        Ok(())
    }
}
