//! Outbound mode notification
//!
//! Every mode change is written to a small JSON file so that an overlay or
//! tray helper can show whether keyboard and mouse are currently captured.

use crate::mapping::{ControllerMode, ModeChange, ModeChangeCause};
use crossbeam_channel::Receiver;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Resolve the status file path. Relative paths land next to the executable.
pub fn resolve_status_path(file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return exe_dir.join(path);
        }
    }

    // Fallback to current directory
    path.to_path_buf()
}

/// Contents of the status file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub mode: ControllerMode,

    /// `None` for the report written at startup
    #[serde(default)]
    pub cause: Option<ModeChangeCause>,

    /// Unix timestamp (seconds)
    #[serde(default)]
    pub changed_at: u64,
}

impl StatusReport {
    pub fn startup() -> Self {
        Self {
            mode: ControllerMode::Passthrough,
            cause: None,
            changed_at: unix_now(),
        }
    }

    pub fn from_change(change: ModeChange) -> Self {
        Self {
            mode: change.mode,
            cause: Some(change.cause),
            changed_at: unix_now(),
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!("Wrote status to: {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Write a report for every mode change until `changes` disconnects
pub fn spawn_publisher(path: PathBuf, changes: Receiver<ModeChange>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("status".to_string())
        .spawn(move || {
            info!("Publishing mode status to: {}", path.display());

            if let Err(e) = StatusReport::startup().save(&path) {
                warn!("Failed to write status file: {}", e);
            }

            for change in changes.iter() {
                if let Err(e) = StatusReport::from_change(change).save(&path) {
                    warn!("Failed to write status file: {}", e);
                }
            }

            debug!("Status publisher exited");
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kbm2pad-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn absolute_paths_are_kept() {
        let path = std::env::temp_dir().join("status.json");
        assert_eq!(resolve_status_path(path.to_str().unwrap()), path);
    }

    #[test]
    fn relative_paths_get_a_directory() {
        let path = resolve_status_path("status.json");
        assert!(path.ends_with("status.json"));
    }

    #[test]
    fn report_survives_disk() {
        let path = temp_path("report");
        let report = StatusReport::from_change(ModeChange {
            mode: ControllerMode::Passthrough,
            cause: ModeChangeCause::SinkFailure("bus gone".into()),
        });
        report.save(&path).unwrap();
        assert_eq!(StatusReport::load(&path).unwrap(), report);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn publisher_writes_latest_change() {
        let path = temp_path("publisher");
        let (tx, rx) = unbounded();
        let handle = spawn_publisher(path.clone(), rx).unwrap();

        tx.send(ModeChange {
            mode: ControllerMode::Emulation,
            cause: ModeChangeCause::ToggleKey,
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();

        let report = StatusReport::load(&path).unwrap();
        assert_eq!(report.mode, ControllerMode::Emulation);
        assert_eq!(report.cause, Some(ModeChangeCause::ToggleKey));
        let _ = fs::remove_file(&path);
    }
}
