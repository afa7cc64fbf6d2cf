//! Device source backed by the Interception kernel driver.
//!
//! The driver hands over raw strokes and only lets a stroke reach the OS if
//! it is sent back. One mouse stroke can carry motion, button transitions
//! and a wheel notch at once, so a stroke is split into events and held
//! until every one of them has a decision. It is sent back only if none of
//! them was suppressed.

use super::{BackendError, DeviceSource};
use crate::input::{MouseButton, RawInputEvent};
use interception as ic;
use log::{debug, info, trace};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const BUTTON_STATES: [(ic::MouseState, MouseButton, bool); 10] = [
    (ic::MouseState::LEFT_BUTTON_DOWN, MouseButton::Left, true),
    (ic::MouseState::LEFT_BUTTON_UP, MouseButton::Left, false),
    (ic::MouseState::RIGHT_BUTTON_DOWN, MouseButton::Right, true),
    (ic::MouseState::RIGHT_BUTTON_UP, MouseButton::Right, false),
    (ic::MouseState::MIDDLE_BUTTON_DOWN, MouseButton::Middle, true),
    (ic::MouseState::MIDDLE_BUTTON_UP, MouseButton::Middle, false),
    (ic::MouseState::BUTTON_4_DOWN, MouseButton::X1, true),
    (ic::MouseState::BUTTON_4_UP, MouseButton::X1, false),
    (ic::MouseState::BUTTON_5_DOWN, MouseButton::X2, true),
    (ic::MouseState::BUTTON_5_UP, MouseButton::X2, false),
];

/// A stroke waiting for the decisions of its events
struct HeldStroke {
    device: ic::Device,
    stroke: ic::Stroke,
    undecided: usize,
    suppress: bool,
}

pub struct InterceptionSource {
    context: ic::Interception,
    held: Option<HeldStroke>,
    queue: VecDeque<RawInputEvent>,
    /// An event was handed out and has no decision yet
    awaiting: bool,
}

// The context handle is only ever used from the thread owning the source
unsafe impl Send for InterceptionSource {}

impl InterceptionSource {
    /// Connect to the driver and capture every keyboard and mouse
    pub fn open() -> Result<Self, BackendError> {
        let context = ic::Interception::new().ok_or_else(|| {
            BackendError::SourceUnavailable(
                "could not open the Interception driver (is it installed?)".into(),
            )
        })?;

        context.set_filter(ic::is_keyboard, ic::Filter::KeyFilter(ic::KeyFilter::all()));
        context.set_filter(ic::is_mouse, ic::Filter::MouseFilter(ic::MouseFilter::all()));

        info!("✓ Interception driver connected");

        Ok(Self {
            context,
            held: None,
            queue: VecDeque::new(),
            awaiting: false,
        })
    }

    fn receive(&mut self, timeout: Duration) -> Result<(), BackendError> {
        let device = self.context.wait_with_timeout(timeout);
        if device <= 0 {
            return Ok(());
        }

        let mut strokes = [ic::Stroke::Keyboard {
            code: ic::ScanCode::Esc,
            state: ic::KeyState::empty(),
            information: 0,
        }];
        if self.context.receive(device, &mut strokes) <= 0 {
            return Ok(());
        }

        let stroke = strokes[0];
        let at = Instant::now();
        let events = translate(&stroke, at);

        if events.is_empty() {
            // Nothing we understand (absolute motion, horizontal wheel)
            trace!("Forwarding untranslated stroke from device {}", device);
            self.forward(device, &stroke)?;
            return Ok(());
        }

        self.held = Some(HeldStroke {
            device,
            stroke,
            undecided: events.len(),
            suppress: false,
        });
        self.queue.extend(events);
        Ok(())
    }

    fn forward(&self, device: ic::Device, stroke: &ic::Stroke) -> Result<(), BackendError> {
        if self.context.send(device, std::slice::from_ref(stroke)) <= 0 {
            return Err(BackendError::Source(format!(
                "driver refused to forward a stroke to device {}",
                device
            )));
        }
        Ok(())
    }

    fn settle(&mut self) -> Result<(), BackendError> {
        let Some(held) = self.held.take() else {
            return Ok(());
        };
        if held.suppress {
            trace!("Dropped stroke from device {}", held.device);
            Ok(())
        } else {
            self.forward(held.device, &held.stroke)
        }
    }
}

impl DeviceSource for InterceptionSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<RawInputEvent>, BackendError> {
        if self.awaiting {
            return Err(BackendError::Undecided);
        }

        if self.queue.is_empty() {
            self.receive(timeout)?;
        }

        let event = self.queue.pop_front();
        self.awaiting = event.is_some();
        Ok(event)
    }

    fn set_suppressed(&mut self, _event: &RawInputEvent, suppress: bool) -> Result<(), BackendError> {
        self.awaiting = false;

        let Some(held) = self.held.as_mut() else {
            return Ok(());
        };
        held.suppress |= suppress;
        held.undecided = held.undecided.saturating_sub(1);

        if held.undecided == 0 {
            self.settle()?;
        }
        Ok(())
    }

    fn release_pending(&mut self) -> Result<(), BackendError> {
        self.awaiting = false;
        self.queue.clear();
        if let Some(held) = self.held.take() {
            debug!("Releasing held stroke from device {}", held.device);
            self.forward(held.device, &held.stroke)?;
        }
        Ok(())
    }
}

impl Drop for InterceptionSource {
    fn drop(&mut self) {
        let _ = self.release_pending();
        // Stop capturing so input flows normally once the process is gone
        self.context.set_filter(ic::is_keyboard, ic::Filter::KeyFilter(ic::KeyFilter::empty()));
        self.context.set_filter(ic::is_mouse, ic::Filter::MouseFilter(ic::MouseFilter::empty()));
    }
}

fn translate(stroke: &ic::Stroke, at: Instant) -> Vec<RawInputEvent> {
    match *stroke {
        ic::Stroke::Keyboard { code, state, .. } => {
            let pressed = !state.contains(ic::KeyState::UP);
            match u8::try_from(code as u16) {
                Ok(code) if code != 0 => vec![RawInputEvent::key(code, pressed).at(at)],
                _ => Vec::new(),
            }
        }
        ic::Stroke::Mouse {
            state,
            flags,
            rolling,
            x,
            y,
            ..
        } => {
            let mut events = Vec::new();

            if !flags.contains(ic::MouseFlags::MOVE_ABSOLUTE) && (x != 0 || y != 0) {
                events.push(RawInputEvent::mouse_move(x, y).at(at));
            }

            for (flag, button, pressed) in BUTTON_STATES {
                if state.contains(flag) {
                    events.push(RawInputEvent::mouse_button(button, pressed).at(at));
                }
            }

            if state.contains(ic::MouseState::WHEEL) && rolling != 0 {
                events.push(RawInputEvent::wheel(i32::from(rolling)).at(at));
            }

            events
        }
    }
}
