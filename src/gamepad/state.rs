//! Controller state definitions
//!
//! Stick components are normalized to [-1.0, 1.0] with +y meaning up,
//! triggers to [0.0, 1.0]. Every constructor and setter clamps, so a
//! `ControllerState` can never hold NaN or out-of-range values.

use serde::{Deserialize, Serialize};

/// Digital buttons, named after the Xbox 360 layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    A, B, X, Y,
    Lb, Rb,
    Back, Start, Guide,
    Ls, Rs,
    DpadUp, DpadDown, DpadLeft, DpadRight,
}

impl Button {
    /// XUSB button bit
    pub fn mask(self) -> u16 {
        match self {
            Button::DpadUp => 0x0001,
            Button::DpadDown => 0x0002,
            Button::DpadLeft => 0x0004,
            Button::DpadRight => 0x0008,
            Button::Start => 0x0010,
            Button::Back => 0x0020,
            Button::Ls => 0x0040,
            Button::Rs => 0x0080,
            Button::Lb => 0x0100,
            Button::Rb => 0x0200,
            Button::Guide => 0x0400,
            Button::A => 0x1000,
            Button::B => 0x2000,
            Button::X => 0x4000,
            Button::Y => 0x8000,
        }
    }
}

/// Set of held buttons as an XUSB button word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Buttons(u16);

impl Buttons {
    pub const NONE: Buttons = Buttons(0);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, button: Button) -> bool {
        self.0 & button.mask() != 0
    }

    pub fn set(&mut self, button: Button, held: bool) {
        if held {
            self.0 |= button.mask();
        } else {
            self.0 &= !button.mask();
        }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stick {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Left,
    Right,
}

/// Digital stick direction (WASD-style stick emulation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit vector, +y is up
    pub fn unit(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }
}

/// Stick position inside the unit circle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StickPosition {
    pub x: f32,
    pub y: f32,
}

impl StickPosition {
    pub const CENTER: StickPosition = StickPosition { x: 0.0, y: 0.0 };

    /// Build a position, replacing non-finite components with 0 and pulling
    /// the vector back onto the unit circle if it lies outside.
    pub fn clamped(x: f32, y: f32) -> Self {
        let x = if x.is_finite() { x } else { 0.0 };
        let y = if y.is_finite() { y } else { 0.0 };

        let magnitude = (x * x + y * y).sqrt();
        let (x, y) = if magnitude > 1.0 {
            (x / magnitude, y / magnitude)
        } else {
            (x, y)
        };

        Self {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(-1.0, 1.0),
        }
    }

    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_centered(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Full controller snapshot submitted to the virtual device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub buttons: Buttons,
}

impl ControllerState {
    /// Rest state: sticks centered, triggers released, no buttons held.
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    pub fn stick(&self, stick: Stick) -> StickPosition {
        match stick {
            Stick::Left => self.left_stick,
            Stick::Right => self.right_stick,
        }
    }

    pub fn set_stick(&mut self, stick: Stick, position: StickPosition) {
        let position = StickPosition::clamped(position.x, position.y);
        match stick {
            Stick::Left => self.left_stick = position,
            Stick::Right => self.right_stick = position,
        }
    }

    pub fn trigger(&self, trigger: Trigger) -> f32 {
        match trigger {
            Trigger::Left => self.left_trigger,
            Trigger::Right => self.right_trigger,
        }
    }

    pub fn set_trigger(&mut self, trigger: Trigger, value: f32) {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        match trigger {
            Trigger::Left => self.left_trigger = value,
            Trigger::Right => self.right_trigger = value,
        }
    }
}

/// Scale a normalized stick component to the XUSB signed 16-bit range.
pub fn thumb_to_i16(value: f32) -> i16 {
    let value = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
    // -1.0 maps to i16::MIN, +1.0 saturates at i16::MAX
    (value as f64 * 32768.0).clamp(i16::MIN as f64, i16::MAX as f64) as i16
}

/// Scale a normalized trigger value to the XUSB 8-bit range.
pub fn trigger_to_u8(value: f32) -> u8 {
    let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    (value * u8::MAX as f32).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_set_and_clear() {
        let mut buttons = Buttons::NONE;
        buttons.set(Button::A, true);
        buttons.set(Button::DpadLeft, true);
        assert!(buttons.contains(Button::A));
        assert!(buttons.contains(Button::DpadLeft));
        assert_eq!(buttons.bits(), 0x1004);

        buttons.set(Button::A, false);
        assert!(!buttons.contains(Button::A));
        assert_eq!(buttons.bits(), 0x0004);
    }

    #[test]
    fn stick_position_clamps_to_unit_circle() {
        let p = StickPosition::clamped(3.0, 4.0);
        assert!((p.x - 0.6).abs() < 1e-6);
        assert!((p.y - 0.8).abs() < 1e-6);
        assert!(p.magnitude() <= 1.0 + 1e-6);

        let inside = StickPosition::clamped(0.5, -0.25);
        assert_eq!(inside, StickPosition { x: 0.5, y: -0.25 });
    }

    #[test]
    fn stick_position_rejects_non_finite() {
        let p = StickPosition::clamped(f32::NAN, f32::INFINITY);
        assert_eq!(p, StickPosition::CENTER);
    }

    #[test]
    fn triggers_are_clamped() {
        let mut state = ControllerState::neutral();
        state.set_trigger(Trigger::Left, 2.0);
        state.set_trigger(Trigger::Right, f32::NAN);
        assert_eq!(state.left_trigger, 1.0);
        assert_eq!(state.right_trigger, 0.0);
    }

    #[test]
    fn report_scaling() {
        assert_eq!(thumb_to_i16(1.0), i16::MAX);
        assert_eq!(thumb_to_i16(-1.0), i16::MIN);
        assert_eq!(thumb_to_i16(0.0), 0);
        assert_eq!(trigger_to_u8(1.0), 255);
        assert_eq!(trigger_to_u8(0.0), 0);
    }

    #[test]
    fn neutral_state() {
        let state = ControllerState::neutral();
        assert!(state.is_neutral());
        assert!(state.left_stick.is_centered());
        assert!(state.buttons.is_empty());
    }
}
