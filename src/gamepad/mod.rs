//! Virtual gamepad model
//!
//! The state snapshot handed to the controller sink, laid out like an
//! XInput/XUSB report: two sticks, two triggers and a 16-bit button word.

pub mod state;

pub use state::*;
