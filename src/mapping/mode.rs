//! Pass-through / emulation mode state machine
//!
//! One instance is owned by whoever drives the engine and passed to it by
//! reference. The only user-driven transition is a *press* of the toggle
//! key; auto-repeat presses while the key is held and the release are
//! ignored. Other components may force a mode (sink failure fallback,
//! shutdown) and every transition is broadcast to subscribers.

use crate::input::KeyCode;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Input delivery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerMode {
    /// Physical input reaches the OS untouched
    Passthrough,

    /// Physical input is consumed and drives the virtual controller
    Emulation,
}

impl ControllerMode {
    pub fn flipped(self) -> Self {
        match self {
            ControllerMode::Passthrough => ControllerMode::Emulation,
            ControllerMode::Emulation => ControllerMode::Passthrough,
        }
    }
}

/// Why a mode change happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ModeChangeCause {
    ToggleKey,
    SinkFailure(String),
    Shutdown,
}

/// Notification sent to subscribers on every transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub mode: ControllerMode,
    pub cause: ModeChangeCause,
}

pub struct ModeController {
    mode: ControllerMode,
    toggle_key: KeyCode,
    /// Toggle key is physically down (debounces auto-repeat)
    toggle_held: bool,
    subscribers: Vec<Sender<ModeChange>>,
}

impl ModeController {
    /// Starts in pass-through
    pub fn new(toggle_key: KeyCode) -> Self {
        Self {
            mode: ControllerMode::Passthrough,
            toggle_key,
            toggle_held: false,
            subscribers: Vec::new(),
        }
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn toggle_key(&self) -> KeyCode {
        self.toggle_key
    }

    pub fn is_toggle_key(&self, code: KeyCode) -> bool {
        code == self.toggle_key
    }

    /// Receive every future mode change. Dropped receivers are pruned.
    pub fn subscribe(&mut self) -> Receiver<ModeChange> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Register an existing channel for mode changes
    pub fn add_subscriber(&mut self, tx: Sender<ModeChange>) {
        self.subscribers.push(tx);
    }

    /// Feed a toggle key transition. Returns the new mode if it flipped.
    pub fn on_toggle_key(&mut self, pressed: bool) -> Option<ControllerMode> {
        if !pressed {
            self.toggle_held = false;
            return None;
        }

        if self.toggle_held {
            debug!("Toggle key repeat ignored");
            return None;
        }

        self.toggle_held = true;
        let next = self.mode.flipped();
        self.transition(next, ModeChangeCause::ToggleKey);
        Some(next)
    }

    /// Force a mode. Returns true if the mode actually changed.
    pub fn force(&mut self, mode: ControllerMode, cause: ModeChangeCause) -> bool {
        if self.mode == mode {
            return false;
        }
        self.transition(mode, cause);
        true
    }

    fn transition(&mut self, mode: ControllerMode, cause: ModeChangeCause) {
        info!("🎮 Mode: {:?} -> {:?} ({:?})", self.mode, mode, cause);
        self.mode = mode;

        let change = ModeChange { mode, cause };
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAVE: KeyCode = KeyCode(0x29);

    #[test]
    fn starts_in_passthrough() {
        let mode = ModeController::new(GRAVE);
        assert_eq!(mode.mode(), ControllerMode::Passthrough);
        assert!(mode.is_toggle_key(GRAVE));
        assert!(!mode.is_toggle_key(KeyCode(0x11)));
    }

    #[test]
    fn press_flips_release_does_not() {
        let mut mode = ModeController::new(GRAVE);
        assert_eq!(mode.on_toggle_key(true), Some(ControllerMode::Emulation));
        assert_eq!(mode.on_toggle_key(false), None);
        assert_eq!(mode.mode(), ControllerMode::Emulation);
    }

    #[test]
    fn two_presses_round_trip() {
        let mut mode = ModeController::new(GRAVE);
        let start = mode.mode();
        mode.on_toggle_key(true);
        mode.on_toggle_key(false);
        mode.on_toggle_key(true);
        mode.on_toggle_key(false);
        assert_eq!(mode.mode(), start);
    }

    #[test]
    fn auto_repeat_is_debounced() {
        let mut mode = ModeController::new(GRAVE);
        assert_eq!(mode.on_toggle_key(true), Some(ControllerMode::Emulation));
        assert_eq!(mode.on_toggle_key(true), None);
        assert_eq!(mode.on_toggle_key(true), None);
        assert_eq!(mode.mode(), ControllerMode::Emulation);
    }

    #[test]
    fn subscribers_see_transitions() {
        let mut mode = ModeController::new(GRAVE);
        let rx = mode.subscribe();

        mode.on_toggle_key(true);
        mode.on_toggle_key(false);
        assert!(mode.force(
            ControllerMode::Passthrough,
            ModeChangeCause::SinkFailure("bus gone".into())
        ));
        assert!(!mode.force(ControllerMode::Passthrough, ModeChangeCause::Shutdown));

        let changes: Vec<ModeChange> = rx.try_iter().collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].mode, ControllerMode::Emulation);
        assert_eq!(changes[0].cause, ModeChangeCause::ToggleKey);
        assert_eq!(changes[1].mode, ControllerMode::Passthrough);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut mode = ModeController::new(GRAVE);
        drop(mode.subscribe());
        mode.on_toggle_key(true);
        assert!(mode.subscribers.is_empty());
    }
}
