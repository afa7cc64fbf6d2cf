//! Translation engine - turns raw keyboard/mouse events into controller state
//!
//! This is the core of the event-driven architecture. Every raw event is
//! answered with a suppress decision and, when the virtual controller
//! changed, a fresh `ControllerState` snapshot to submit:
//!
//! - The toggle key flips the mode and is always suppressed
//! - In pass-through nothing is translated and nothing is suppressed
//! - In emulation everything is suppressed, mapped or not
//!
//! Timer ticks let the mouse-driven stick decay back to center, release
//! wheel pulses and end a dodge lock.

use crate::gamepad::{Button, ControllerState, Direction, Stick, StickPosition, Trigger};
use crate::input::{EngineEvent, InputKind, RawInputEvent};
use crate::mapping::config::{Action, Bind, Config, DodgeSettings, LimitAction, WheelDirection};
use crate::mapping::mode::{ControllerMode, ModeChangeCause, ModeController};
use crate::mapping::mouse::MouseStick;
use log::{debug, info, trace};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Outcome of handling one engine event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    /// Block the originating hardware event from reaching the OS
    pub suppress: bool,

    /// Snapshot to hand to the controller sink, if anything changed
    pub submit: Option<ControllerState>,

    /// The event had no binding (counted, never fatal)
    pub unmapped: bool,
}

impl Decision {
    fn pass() -> Self {
        Self { suppress: false, submit: None, unmapped: false }
    }

    fn consume(submit: Option<ControllerState>) -> Self {
        Self { suppress: true, submit, unmapped: false }
    }
}

/// Add one claim on `key`
fn claim<K: Hash + Eq>(counts: &mut HashMap<K, u32>, key: K) {
    *counts.entry(key).or_insert(0) += 1;
}

/// Drop one claim on `key`, forgetting it once unclaimed
fn unclaim<K: Hash + Eq>(counts: &mut HashMap<K, u32>, key: K) {
    if let Some(count) = counts.get_mut(&key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(&key);
        }
    }
}

/// Tracks which inputs are held and what they contribute.
///
/// Several binds may target the same button, trigger or direction, so each
/// target keeps a reference count and stays held until every claimant lets go.
#[derive(Default)]
struct HeldState {
    /// Physical inputs currently down (dedupes auto-repeat presses)
    binds: HashSet<Bind>,
    buttons: HashMap<Button, u32>,
    triggers: HashMap<Trigger, u32>,
    directions: HashMap<(Stick, Direction), u32>,
    /// Held analog binds in press order; the latest wins
    analog: Vec<(Bind, Stick, f32, f32)>,
}

impl HeldState {
    fn clear(&mut self) {
        self.binds.clear();
        self.buttons.clear();
        self.triggers.clear();
        self.directions.clear();
        self.analog.clear();
    }
}

/// Radius limit on the mouse-driven stick
#[derive(Debug, Clone, Copy)]
struct RadiusLimit {
    enabled: bool,
    value: f32,
}

impl RadiusLimit {
    fn factor(self) -> f32 {
        if self.enabled { self.value } else { 1.0 }
    }
}

/// Mouse-driven stick pinned to a dodge direction until `until`
#[derive(Debug, Clone, Copy)]
struct DodgeLock {
    position: StickPosition,
    until: Instant,
}

pub struct TranslationEngine {
    binds: HashMap<Bind, Action>,
    mouse_target: Stick,
    wheel_hold: Duration,
    limit_step: f32,
    dodge: DodgeSettings,

    held: HeldState,
    mouse: MouseStick,
    limit: RadiusLimit,
    /// Active wheel pulses and when they release
    pulses: HashMap<WheelDirection, Instant>,
    dodge_lock: Option<DodgeLock>,

    /// Last composed controller state
    state: ControllerState,
}

impl TranslationEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            binds: config.binds.clone(),
            mouse_target: config.mouse.stick,
            wheel_hold: config.settings.wheel_hold(),
            limit_step: config.limit.step,
            dodge: config.dodge.clone(),
            held: HeldState::default(),
            mouse: MouseStick::new(&config.mouse),
            limit: RadiusLimit { enabled: false, value: 1.0 },
            pulses: HashMap::new(),
            dodge_lock: None,
            state: ControllerState::neutral(),
        }
    }

    /// Current in-memory controller state
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Handle one event under the mode held by `mode`
    pub fn handle(&mut self, mode: &mut ModeController, event: &EngineEvent) -> Decision {
        match event {
            EngineEvent::Input(raw) => {
                if let InputKind::Key { code, pressed } = raw.kind {
                    if mode.is_toggle_key(code) {
                        return self.on_toggle_key(mode, pressed);
                    }
                }

                match mode.mode() {
                    ControllerMode::Passthrough => Decision::pass(),
                    ControllerMode::Emulation => {
                        let mapped = self.apply_input(raw);
                        Decision {
                            unmapped: !mapped,
                            ..Decision::consume(self.compose())
                        }
                    }
                }
            }

            EngineEvent::Tick { at } => match mode.mode() {
                ControllerMode::Passthrough => Decision::pass(),
                ControllerMode::Emulation => {
                    self.mouse.decay_to(*at);
                    self.expire_pulses(*at);
                    self.expire_dodge(*at);
                    Decision {
                        suppress: false,
                        submit: self.compose(),
                        unmapped: false,
                    }
                }
            },
        }
    }

    /// Force pass-through (sink failure, shutdown). Returns the rest state to
    /// submit if the mode actually changed.
    pub fn enter_passthrough(
        &mut self,
        mode: &mut ModeController,
        cause: ModeChangeCause,
    ) -> Option<ControllerState> {
        if mode.force(ControllerMode::Passthrough, cause) {
            Some(self.rest())
        } else {
            None
        }
    }

    fn on_toggle_key(&mut self, mode: &mut ModeController, pressed: bool) -> Decision {
        match mode.on_toggle_key(pressed) {
            // Leaving emulation: one final rest report so nothing stays stuck
            Some(ControllerMode::Passthrough) => Decision::consume(Some(self.rest())),
            Some(ControllerMode::Emulation) => {
                // Keys pressed during pass-through must not count as held
                self.rest();
                Decision::consume(None)
            }
            None => Decision::consume(None),
        }
    }

    /// Drop every held input and return the neutral state
    fn rest(&mut self) -> ControllerState {
        self.held.clear();
        self.pulses.clear();
        self.dodge_lock = None;
        self.mouse.reset();
        self.state = ControllerState::neutral();
        self.state
    }

    /// Apply an emulation-mode input. Returns false if nothing is bound to it.
    fn apply_input(&mut self, raw: &RawInputEvent) -> bool {
        self.expire_pulses(raw.at);
        self.expire_dodge(raw.at);

        match raw.kind {
            InputKind::Key { code, pressed } => self.on_bind(Bind::Key(code), pressed, raw.at),
            InputKind::MouseButton { button, pressed } => {
                self.on_bind(Bind::Mouse(button), pressed, raw.at)
            }
            InputKind::MouseWheel { delta } => self.on_wheel(delta, raw.at),
            InputKind::MouseMove { dx, dy } => {
                self.mouse.push(dx, dy, raw.at);
                true
            }
        }
    }

    /// Edge-triggered press/release of a bound input
    fn on_bind(&mut self, bind: Bind, pressed: bool, at: Instant) -> bool {
        let Some(action) = self.binds.get(&bind).copied() else {
            trace!("Unmapped input {} ({})", bind, if pressed { "down" } else { "up" });
            return false;
        };

        if pressed {
            if !self.held.binds.insert(bind) {
                trace!("Ignoring repeat press of {}", bind);
                return true;
            }
            self.press(bind, action);
            if self.dodge.jump == Some(bind) {
                self.start_dodge(at);
            }
        } else {
            if !self.held.binds.remove(&bind) {
                // Released without a press seen in emulation
                return true;
            }
            self.release(bind, action);
        }

        true
    }

    /// A wheel notch presses its action for `wheel_hold`
    fn on_wheel(&mut self, delta: i32, at: Instant) -> bool {
        let direction = match delta.signum() {
            1 => WheelDirection::Up,
            -1 => WheelDirection::Down,
            _ => return false,
        };

        let bind = Bind::Wheel(direction);
        let Some(action) = self.binds.get(&bind).copied() else {
            trace!("Unmapped input {}", bind);
            return false;
        };

        let release_at = at + self.wheel_hold;
        if let Some(existing) = self.pulses.get_mut(&direction) {
            *existing = release_at;
        } else {
            self.press(bind, action);
            self.pulses.insert(direction, release_at);
        }

        true
    }

    fn expire_pulses(&mut self, at: Instant) {
        let expired: Vec<WheelDirection> = self.pulses.iter()
            .filter(|(_, release_at)| **release_at <= at)
            .map(|(direction, _)| *direction)
            .collect();

        for direction in expired {
            self.pulses.remove(&direction);
            let bind = Bind::Wheel(direction);
            if let Some(action) = self.binds.get(&bind).copied() {
                self.release(bind, action);
            }
        }
    }

    /// Pin the mouse-driven stick to the sum of the held dodge directions.
    /// With none held the stick is pinned to center.
    fn start_dodge(&mut self, at: Instant) {
        let (mut x, mut y) = (0.0f32, 0.0f32);
        for (bind, direction) in self.dodge.directions() {
            if self.held.binds.contains(&bind) {
                let (ux, uy) = direction.unit();
                x += ux;
                y += uy;
            }
        }

        let unit = StickPosition::clamped(x, y);
        let factor = self.limit.factor();
        let position = StickPosition::clamped(unit.x * factor, unit.y * factor);

        debug!("Dodge lock ({:.2}, {:.2}) for {:?}", position.x, position.y, self.dodge.lock());
        self.dodge_lock = Some(DodgeLock { position, until: at + self.dodge.lock() });
    }

    fn expire_dodge(&mut self, at: Instant) {
        if self.dodge_lock.is_some_and(|lock| lock.until <= at) {
            trace!("Dodge lock released");
            self.dodge_lock = None;
        }
    }

    fn press(&mut self, bind: Bind, action: Action) {
        match action {
            Action::None | Action::Toggle => {}
            Action::Button { button } => claim(&mut self.held.buttons, button),
            Action::Trigger { trigger } => claim(&mut self.held.triggers, trigger),
            Action::Direction { stick, direction } => claim(&mut self.held.directions, (stick, direction)),
            Action::Analog { stick, x, y } => self.held.analog.push((bind, stick, x, y)),
            Action::Limit { action } => self.apply_limit(action),
        }
    }

    fn release(&mut self, bind: Bind, action: Action) {
        match action {
            Action::None | Action::Toggle | Action::Limit { .. } => {}
            Action::Button { button } => unclaim(&mut self.held.buttons, button),
            Action::Trigger { trigger } => unclaim(&mut self.held.triggers, trigger),
            Action::Direction { stick, direction } => unclaim(&mut self.held.directions, (stick, direction)),
            Action::Analog { .. } => self.held.analog.retain(|(held, ..)| *held != bind),
        }
    }

    fn apply_limit(&mut self, action: LimitAction) {
        match action {
            LimitAction::Toggle => {
                self.limit.enabled = !self.limit.enabled;
                info!("Stick limit {} ({:.2})", if self.limit.enabled { "ON" } else { "OFF" }, self.limit.value);
            }
            LimitAction::Increase => {
                self.limit.value = (self.limit.value + self.limit_step).min(1.0);
                info!("Stick limit: {:.2}", self.limit.value);
            }
            LimitAction::Decrease => {
                self.limit.value = (self.limit.value - self.limit_step).max(0.0);
                info!("Stick limit: {:.2}", self.limit.value);
            }
            LimitAction::Reset => {
                self.limit.enabled = false;
                info!("Stick limit reset");
            }
        }
    }

    /// Position of one stick from everything currently driving it
    fn stick_position(&self, stick: Stick) -> StickPosition {
        if stick == self.mouse_target {
            if let Some(lock) = self.dodge_lock {
                return lock.position;
            }
        }

        // A held analog bind overrides every other source
        if let Some(&(_, _, x, y)) = self.held.analog.iter().rev().find(|(_, s, ..)| *s == stick) {
            return StickPosition::clamped(x, y);
        }

        let (mut x, mut y) = (0.0f32, 0.0f32);
        for direction in Direction::ALL {
            if self.held.directions.contains_key(&(stick, direction)) {
                let (ux, uy) = direction.unit();
                x += ux;
                y += uy;
            }
        }

        // Diagonals are unit length; opposite directions cancel out
        let magnitude = (x * x + y * y).sqrt();
        if magnitude > 0.0 {
            x /= magnitude;
            y /= magnitude;
        }

        if stick == self.mouse_target {
            let mouse = self.mouse.position(self.limit.factor());
            x += mouse.x;
            y += mouse.y;
        }

        StickPosition::clamped(x, y)
    }

    /// Rebuild the controller state. Returns it only when it changed.
    fn compose(&mut self) -> Option<ControllerState> {
        let mut next = ControllerState::neutral();

        for button in self.held.buttons.keys() {
            next.buttons.set(*button, true);
        }
        for trigger in self.held.triggers.keys() {
            next.set_trigger(*trigger, 1.0);
        }
        next.set_stick(Stick::Left, self.stick_position(Stick::Left));
        next.set_stick(Stick::Right, self.stick_position(Stick::Right));

        if next == self.state {
            return None;
        }

        debug!("Controller state: {:?}", next);
        self.state = next;
        Some(next)
    }
}
