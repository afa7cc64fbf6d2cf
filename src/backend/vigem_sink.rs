//! Controller sink backed by the ViGEmBus virtual bus driver.
//!
//! Plugs in one wired Xbox 360 controller and forwards full state reports.

use super::{BackendError, ControllerSink};
use crate::gamepad::{thumb_to_i16, trigger_to_u8, ControllerState};
use log::info;
use vigem_client::{Client, TargetId, XButtons, XGamepad, Xbox360Wired};

pub struct VigemSink {
    target: Xbox360Wired<Client>,
    plugged: bool,
}

impl VigemSink {
    /// Connect to the bus and plug in a virtual controller
    pub fn connect() -> Result<Self, BackendError> {
        let client = Client::connect().map_err(|e| {
            BackendError::SinkUnavailable(format!("ViGEmBus not reachable (is it installed?): {}", e))
        })?;

        let mut target = Xbox360Wired::new(client, TargetId::XBOX360_WIRED);
        target
            .plugin()
            .map_err(|e| BackendError::SinkUnavailable(format!("plugin failed: {}", e)))?;
        target
            .wait_ready()
            .map_err(|e| BackendError::SinkUnavailable(format!("controller never became ready: {}", e)))?;

        info!("✓ Virtual Xbox 360 controller plugged in");

        Ok(Self {
            target,
            plugged: true,
        })
    }
}

fn to_report(state: &ControllerState) -> XGamepad {
    XGamepad {
        buttons: XButtons {
            raw: state.buttons.bits(),
        },
        left_trigger: trigger_to_u8(state.left_trigger),
        right_trigger: trigger_to_u8(state.right_trigger),
        thumb_lx: thumb_to_i16(state.left_stick.x),
        thumb_ly: thumb_to_i16(state.left_stick.y),
        thumb_rx: thumb_to_i16(state.right_stick.x),
        thumb_ry: thumb_to_i16(state.right_stick.y),
    }
}

impl ControllerSink for VigemSink {
    fn submit(&mut self, state: &ControllerState) -> Result<(), BackendError> {
        if !self.plugged {
            return Err(BackendError::Submit("controller already unplugged".into()));
        }
        self.target
            .update(&to_report(state))
            .map_err(|e| BackendError::Submit(e.to_string()))
    }

    fn close(&mut self) -> Result<(), BackendError> {
        if !self.plugged {
            return Ok(());
        }
        self.plugged = false;
        self.target
            .unplug()
            .map_err(|e| BackendError::Submit(format!("unplug failed: {}", e)))?;
        info!("Virtual controller unplugged");
        Ok(())
    }
}

impl Drop for VigemSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
