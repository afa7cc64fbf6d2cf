//! Scheduling priority for the worker threads
//!
//! The event thread holds every keystroke of the machine hostage until it
//! decides, so it runs above normal. The decay timer runs below normal so
//! it can never starve it.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadRole {
    Input,
    Timer,
}

/// Apply the priority for `role` to the calling thread
#[cfg(windows)]
pub fn apply(role: ThreadRole) {
    use log::warn;
    use windows::Win32::System::Threading::{
        GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_ABOVE_NORMAL,
        THREAD_PRIORITY_BELOW_NORMAL,
    };

    let priority = match role {
        ThreadRole::Input => THREAD_PRIORITY_ABOVE_NORMAL,
        ThreadRole::Timer => THREAD_PRIORITY_BELOW_NORMAL,
    };

    unsafe {
        match SetThreadPriority(GetCurrentThread(), priority) {
            Ok(()) => debug!("{:?} thread priority set", role),
            Err(e) => warn!("Failed to set {:?} thread priority: {}", role, e),
        }
    }
}

#[cfg(not(windows))]
pub fn apply(role: ThreadRole) {
    debug!("Thread priorities not supported on this platform ({:?})", role);
}
