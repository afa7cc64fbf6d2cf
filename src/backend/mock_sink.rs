//! Mock controller sink for testing.
//!
//! Records every state report instead of driving a virtual bus. Failures
//! can be scripted to exercise retry and fallback paths.

use super::{BackendError, ControllerSink};
use crate::gamepad::ControllerState;
use log::info;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct SinkState {
    submitted: Vec<ControllerState>,
    /// Fail every submission until cleared
    failing: bool,
    /// Fail this many upcoming submissions
    fail_next: u32,
    attempts: u32,
    closed: bool,
}

/// Mock sink that records submissions. Clones share one record.
#[derive(Clone, Debug, Default)]
pub struct MockSink {
    state: Arc<Mutex<SinkState>>,
}

impl MockSink {
    /// Create a healthy mock sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every submission fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Make the next `count` submissions fail.
    pub fn fail_next(&self, count: u32) {
        self.lock().fail_next = count;
    }

    /// Every accepted report, in order.
    pub fn submitted(&self) -> Vec<ControllerState> {
        self.lock().submitted.clone()
    }

    /// Most recent accepted report.
    pub fn last(&self) -> Option<ControllerState> {
        self.lock().submitted.last().copied()
    }

    /// Submission attempts including failed ones.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ControllerSink for MockSink {
    fn submit(&mut self, state: &ControllerState) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.attempts += 1;

        if inner.closed {
            return Err(BackendError::Submit("controller already unplugged".into()));
        }
        if inner.failing {
            return Err(BackendError::Submit("mock sink set to fail".into()));
        }
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(BackendError::Submit("scripted mock failure".into()));
        }

        info!("[MOCK SINK] Report: {:?}", state);
        inner.submitted.push(*state);
        Ok(())
    }

    fn close(&mut self) -> Result<(), BackendError> {
        info!("[MOCK SINK] Unplugged");
        self.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_reports() {
        let mut sink = MockSink::new();
        let observer = sink.clone();
        sink.submit(&ControllerState::neutral()).unwrap();
        assert_eq!(observer.submitted().len(), 1);
        assert_eq!(observer.last(), Some(ControllerState::neutral()));
    }

    #[test]
    fn scripted_failures_run_out() {
        let mut sink = MockSink::new();
        sink.fail_next(2);
        assert!(sink.submit(&ControllerState::neutral()).is_err());
        assert!(sink.submit(&ControllerState::neutral()).is_err());
        assert!(sink.submit(&ControllerState::neutral()).is_ok());
        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.submitted().len(), 1);
    }

    #[test]
    fn closed_sink_rejects_reports() {
        let mut sink = MockSink::new();
        sink.close().unwrap();
        assert!(sink.is_closed());
        assert!(sink.submit(&ControllerState::neutral()).is_err());
    }
}
