//! Mouse motion -> held stick position
//!
//! A mouse reports displacement, a stick reports position. Each motion
//! delta is added to a displacement estimate (in sensitivity-scaled counts)
//! which decays back to the origin with time. The stick output is that
//! estimate shaped by the deadzone and acceleration curve:
//!
//! ```text
//! m = |d|
//! m < deadzone       -> 0
//! otherwise          -> d / m * min((m / range) ^ exponent, 1) * limit
//! ```
//!
//! The estimate itself is capped at `range`, so the stick starts returning
//! from full deflection as soon as motion stops instead of first unwinding
//! an unbounded backlog.

use crate::gamepad::StickPosition;
use crate::mapping::config::{DecayMode, MouseSettings};
use std::time::{Duration, Instant};

/// Below this many counts the estimate snaps to the origin
const REST_EPSILON: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct MouseStick {
    sensitivity_x: f32,
    sensitivity_y: f32,
    exponent: f32,
    deadzone: f32,
    range: f32,
    decay: DecayMode,
    half_life: Duration,
    invert_y: bool,

    /// Displacement estimate, +y up
    x: f32,
    y: f32,
    /// Time the estimate was last brought up to date
    updated_at: Option<Instant>,
}

impl MouseStick {
    pub fn new(settings: &MouseSettings) -> Self {
        Self {
            sensitivity_x: settings.sensitivity_x,
            sensitivity_y: settings.sensitivity_y,
            exponent: settings.exponent,
            deadzone: settings.deadzone,
            range: settings.range,
            decay: settings.decay,
            half_life: settings.half_life(),
            invert_y: settings.invert_y,
            x: 0.0,
            y: 0.0,
            updated_at: None,
        }
    }

    /// Add a relative motion delta observed at `at`
    pub fn push(&mut self, dx: i32, dy: i32, at: Instant) {
        self.decay_to(at);

        // Mouse y grows downwards, stick y grows upwards
        let dy = if self.invert_y { dy as f32 } else { -(dy as f32) };
        self.x += dx as f32 * self.sensitivity_x;
        self.y += dy * self.sensitivity_y;

        let magnitude = self.magnitude();
        if magnitude > self.range {
            self.x = self.x / magnitude * self.range;
            self.y = self.y / magnitude * self.range;
        }

        if !self.x.is_finite() || !self.y.is_finite() {
            self.reset();
        }
    }

    /// Let the estimate decay up to `at`
    pub fn decay_to(&mut self, at: Instant) {
        let Some(last) = self.updated_at else {
            self.updated_at = Some(at);
            return;
        };

        // Events are ordered, but never run the clock backwards
        if at <= last {
            return;
        }
        self.updated_at = Some(at);

        if self.is_at_rest() {
            return;
        }

        let halves = (at - last).as_secs_f32() / self.half_life.as_secs_f32();
        match self.decay {
            DecayMode::Exponential => {
                let factor = 0.5f32.powf(halves);
                self.x *= factor;
                self.y *= factor;
            }
            DecayMode::Linear => {
                let magnitude = self.magnitude();
                let remaining = (magnitude - halves * self.range * 0.5).max(0.0);
                let scale = if magnitude > 0.0 { remaining / magnitude } else { 0.0 };
                self.x *= scale;
                self.y *= scale;
            }
        }

        // Sub-deadzone residue must survive so slow motion can build up
        if self.magnitude() < REST_EPSILON {
            self.x = 0.0;
            self.y = 0.0;
        }
    }

    /// Stick position for the current estimate, scaled by the radius limit
    pub fn position(&self, limit: f32) -> StickPosition {
        let magnitude = self.magnitude();
        if magnitude == 0.0 || magnitude < self.deadzone {
            return StickPosition::CENTER;
        }

        let shaped = (magnitude / self.range).powf(self.exponent).min(1.0) * limit.clamp(0.0, 1.0);
        StickPosition::clamped(self.x / magnitude * shaped, self.y / magnitude * shaped)
    }

    /// True once the estimate reached the origin (no decay in progress)
    pub fn is_at_rest(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
    }

    fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MouseSettings {
        MouseSettings {
            deadzone: 5.0,
            range: 100.0,
            half_life_ms: 40,
            ..MouseSettings::default()
        }
    }

    #[test]
    fn below_deadzone_is_exactly_zero() {
        let mut stick = MouseStick::new(&settings());
        let t0 = Instant::now();
        stick.push(4, 0, t0);
        assert_eq!(stick.position(1.0), StickPosition::CENTER);

        let mut stick = MouseStick::new(&settings());
        stick.push(-3, 3, t0);
        assert_eq!(stick.position(1.0), StickPosition::CENTER);
    }

    #[test]
    fn at_deadzone_is_nonzero_with_matching_sign() {
        let t0 = Instant::now();

        let mut stick = MouseStick::new(&settings());
        stick.push(5, 0, t0);
        assert!(stick.position(1.0).x > 0.0);

        let mut stick = MouseStick::new(&settings());
        stick.push(-20, 0, t0);
        assert!(stick.position(1.0).x < 0.0);

        // Mouse down -> stick down
        let mut stick = MouseStick::new(&settings());
        stick.push(0, 20, t0);
        assert!(stick.position(1.0).y < 0.0);
    }

    #[test]
    fn large_motion_clamps_to_full_deflection() {
        let mut stick = MouseStick::new(&settings());
        stick.push(500, 0, Instant::now());
        let position = stick.position(1.0);
        assert_eq!(position.x, 1.0);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn linear_curve_is_proportional() {
        let mut stick = MouseStick::new(&settings());
        stick.push(50, 0, Instant::now());
        assert!((stick.position(1.0).x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn exponent_bends_the_curve() {
        let mut settings = settings();
        settings.exponent = 2.0;
        let mut stick = MouseStick::new(&settings);
        stick.push(50, 0, Instant::now());
        assert!((stick.position(1.0).x - 0.25).abs() < 1e-6);
    }

    #[test]
    fn sensitivity_scales_per_axis() {
        let mut settings = settings();
        settings.sensitivity_x = 2.0;
        settings.sensitivity_y = 0.0;
        let mut stick = MouseStick::new(&settings);
        stick.push(25, 40, Instant::now());
        let position = stick.position(1.0);
        assert!((position.x - 0.5).abs() < 1e-6);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn invert_y_flips_vertical() {
        let mut settings = settings();
        settings.invert_y = true;
        let mut stick = MouseStick::new(&settings);
        stick.push(0, 30, Instant::now());
        assert!(stick.position(1.0).y > 0.0);
    }

    #[test]
    fn exponential_decay_halves_per_half_life() {
        let mut stick = MouseStick::new(&settings());
        let t0 = Instant::now();
        stick.push(80, 0, t0);
        stick.decay_to(t0 + Duration::from_millis(40));
        assert!((stick.position(1.0).x - 0.4).abs() < 1e-3);
    }

    #[test]
    fn linear_decay_reaches_rest() {
        let mut settings = settings();
        settings.decay = DecayMode::Linear;
        let mut stick = MouseStick::new(&settings);
        let t0 = Instant::now();
        stick.push(100, 0, t0);

        stick.decay_to(t0 + Duration::from_millis(40));
        assert!((stick.position(1.0).x - 0.5).abs() < 1e-3);

        stick.decay_to(t0 + Duration::from_millis(80));
        assert!(stick.is_at_rest());
    }

    #[test]
    fn ticks_converge_to_rest() {
        let mut stick = MouseStick::new(&settings());
        let t0 = Instant::now();
        stick.push(500, 0, t0);

        // log2(100 / 5) ~ 4.3 half-lives until the deadzone hides it
        for n in 1..=30 {
            stick.decay_to(t0 + Duration::from_millis(8 * n));
        }
        assert_eq!(stick.position(1.0), StickPosition::CENTER);

        // log2(100 / 0.01) ~ 13.3 half-lives until it snaps to the origin
        for n in 31..=100 {
            stick.decay_to(t0 + Duration::from_millis(8 * n));
        }
        assert!(stick.is_at_rest());
    }

    #[test]
    fn slow_motion_accumulates_past_deadzone() {
        let mut stick = MouseStick::new(&settings());
        let t0 = Instant::now();
        for n in 0..20 {
            stick.push(2, 0, t0 + Duration::from_millis(8 * n));
        }
        assert!(stick.position(1.0).x > 0.0);
    }

    #[test]
    fn limit_scales_output() {
        let mut stick = MouseStick::new(&settings());
        stick.push(500, 0, Instant::now());
        assert!((stick.position(0.5).x - 0.5).abs() < 1e-6);
        assert_eq!(stick.position(0.0), StickPosition::CENTER);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut stick = MouseStick::new(&settings());
        let t0 = Instant::now();
        stick.push(60, 0, t0 + Duration::from_millis(10));
        stick.decay_to(t0);
        assert!((stick.position(1.0).x - 0.6).abs() < 1e-6);
    }
}
