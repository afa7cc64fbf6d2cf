//! Mapping module - converts keyboard/mouse input to controller state

pub mod config;
pub mod engine;
pub mod mode;
pub mod mouse;
pub mod pipeline;

pub use config::{Action, Bind, Config, ConfigError, DodgeSettings};
pub use engine::{Decision, TranslationEngine};
pub use mode::{ControllerMode, ModeChange, ModeChangeCause, ModeController};
pub use pipeline::{Diagnostics, Pipeline};
