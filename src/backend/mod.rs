//! Backend abstraction for the two driver collaborators
//!
//! - `DeviceSource`: the interception driver. Yields raw keyboard/mouse
//!   events and blocks each one until told whether it may reach the OS.
//! - `ControllerSink`: the virtual bus driver. Owns one virtual controller
//!   and accepts full state reports.
//!
//! The translation engine only ever sees these traits, so the Windows
//! bindings can be swapped for the mocks in tests.

pub mod mock_sink;
pub mod mock_source;
pub mod offload;

#[cfg(windows)]
pub mod interception_source;
#[cfg(windows)]
pub mod vigem_sink;

#[cfg(windows)]
pub use interception_source::InterceptionSource;
#[cfg(windows)]
pub use vigem_sink::VigemSink;

pub use mock_sink::MockSink;
pub use mock_source::MockSource;
pub use offload::{OffloadedSink, RetryPolicy};

use crate::gamepad::ControllerState;
use crate::input::RawInputEvent;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Input interception unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Virtual controller bus unavailable: {0}")]
    SinkUnavailable(String),

    #[error("Controller report failed: {0}")]
    Submit(String),

    #[error("Device source failed: {0}")]
    Source(String),

    #[error("Previous event was never given a suppress decision")]
    Undecided,

    #[error("Platform not supported")]
    PlatformNotSupported,
}

/// Raw keyboard/mouse event stream with a per-event suppress decision
pub trait DeviceSource {
    /// Wait up to `timeout` for the next hardware event.
    ///
    /// Every returned event must be answered with `set_suppressed` before
    /// this is called again.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>, BackendError>;

    /// Decide whether `event` is blocked (`true`) or reaches the OS (`false`)
    fn set_suppressed(&mut self, event: &RawInputEvent, suppress: bool) -> Result<(), BackendError>;

    /// Let anything still held by the source through to the OS
    fn release_pending(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Virtual controller accepting full state reports
pub trait ControllerSink {
    /// Submit a complete state report (all axes and buttons)
    fn submit(&mut self, state: &ControllerState) -> Result<(), BackendError>;

    /// Submit and return every report outcome learned during the call.
    ///
    /// A synchronous sink learns exactly one: this report's. A sink that
    /// reports asynchronously may learn several earlier outcomes at once,
    /// or none yet; an empty list says nothing about the sink's health.
    fn submit_outcomes(&mut self, state: &ControllerState) -> Vec<Result<(), BackendError>> {
        vec![self.submit(state)]
    }

    /// Release the virtual device
    fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

impl<T: DeviceSource + ?Sized> DeviceSource for Box<T> {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>, BackendError> {
        (**self).next_event(timeout)
    }

    fn set_suppressed(&mut self, event: &RawInputEvent, suppress: bool) -> Result<(), BackendError> {
        (**self).set_suppressed(event, suppress)
    }

    fn release_pending(&mut self) -> Result<(), BackendError> {
        (**self).release_pending()
    }
}

impl<T: ControllerSink + ?Sized> ControllerSink for Box<T> {
    fn submit(&mut self, state: &ControllerState) -> Result<(), BackendError> {
        (**self).submit(state)
    }

    fn submit_outcomes(&mut self, state: &ControllerState) -> Vec<Result<(), BackendError>> {
        (**self).submit_outcomes(state)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        (**self).close()
    }
}

/// Open the platform's interception driver
#[cfg(windows)]
pub fn open_device_source() -> Result<Box<dyn DeviceSource + Send>, BackendError> {
    Ok(Box::new(InterceptionSource::open()?))
}

/// Connect a virtual controller on the platform's bus driver
#[cfg(windows)]
pub fn open_controller_sink() -> Result<Box<dyn ControllerSink + Send>, BackendError> {
    Ok(Box::new(VigemSink::connect()?))
}

#[cfg(not(windows))]
pub fn open_device_source() -> Result<Box<dyn DeviceSource + Send>, BackendError> {
    Err(BackendError::PlatformNotSupported)
}

#[cfg(not(windows))]
pub fn open_controller_sink() -> Result<Box<dyn ControllerSink + Send>, BackendError> {
    Err(BackendError::PlatformNotSupported)
}
