//! Raw input type definitions
//!
//! Keyboard and mouse events arrive merged into one ordered stream. Every
//! event carries the instant it was read from the driver so that time-based
//! processing (decay, wheel pulses) never consults the wall clock itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use super::scancode;

/// Keyboard scan code in the interception driver's 8-bit domain (Set 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match scancode::key_name(*self) {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

/// Physical mouse buttons reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

/// Payload of a raw device event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputKind {
    /// Key transition. Auto-repeat shows up as repeated presses.
    Key { code: KeyCode, pressed: bool },

    /// Relative mouse motion in device counts (positive y is down)
    MouseMove { dx: i32, dy: i32 },

    MouseButton { button: MouseButton, pressed: bool },

    /// Wheel rotation, positive is away from the user (120 per notch)
    MouseWheel { delta: i32 },
}

/// A raw hardware event with its arrival time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawInputEvent {
    pub kind: InputKind,
    pub at: Instant,
}

impl RawInputEvent {
    pub fn new(kind: InputKind, at: Instant) -> Self {
        Self { kind, at }
    }

    /// Stamp an event with the current instant.
    pub fn now(kind: InputKind) -> Self {
        Self::new(kind, Instant::now())
    }

    pub fn key(code: u8, pressed: bool) -> Self {
        Self::now(InputKind::Key { code: KeyCode(code), pressed })
    }

    pub fn mouse_move(dx: i32, dy: i32) -> Self {
        Self::now(InputKind::MouseMove { dx, dy })
    }

    pub fn mouse_button(button: MouseButton, pressed: bool) -> Self {
        Self::now(InputKind::MouseButton { button, pressed })
    }

    pub fn wheel(delta: i32) -> Self {
        Self::now(InputKind::MouseWheel { delta })
    }

    /// Same event re-stamped at `at`.
    pub fn at(mut self, at: Instant) -> Self {
        self.at = at;
        self
    }
}

/// Everything the translation engine consumes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    /// Event from the device source; must be answered with a suppress decision
    Input(RawInputEvent),

    /// Fixed-interval timer tick driving decay
    Tick { at: Instant },
}

impl EngineEvent {
    pub fn at(&self) -> Instant {
        match self {
            EngineEvent::Input(event) => event.at,
            EngineEvent::Tick { at } => *at,
        }
    }
}

impl From<RawInputEvent> for EngineEvent {
    fn from(event: RawInputEvent) -> Self {
        EngineEvent::Input(event)
    }
}
