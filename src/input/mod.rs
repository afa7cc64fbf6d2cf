//! Raw keyboard/mouse input vocabulary
//!
//! This module defines what the device event source hands to the engine:
//! - Raw keyboard and mouse events, timestamped on arrival
//! - Scan-code naming used by the mapping profile
//! - Synthetic timer ticks that drive stick decay

pub mod scancode;
pub mod types;

pub use scancode::{key_name, parse_key_name};
pub use types::*;
