//! kbm2pad: keyboard and mouse to virtual game controller
//!
//! Intercepts raw keyboard/mouse events and, while emulation is toggled on,
//! consumes them and drives a virtual Xbox 360 controller instead. While
//! toggled off every event passes through to the OS untouched.

pub mod backend;
pub mod gamepad;
pub mod input;
pub mod manager;
pub mod mapping;
pub mod status;
pub mod thread_priority;

// Re-export commonly used items
pub use backend::{BackendError, ControllerSink, DeviceSource};
pub use gamepad::ControllerState;
pub use input::{EngineEvent, RawInputEvent};
pub use manager::{EmulatorManager, ManagerError};
pub use mapping::{Config, ControllerMode, Pipeline, TranslationEngine};
