//! kbm2pad - Main Application
//!
//! Captures the REAL keyboard and mouse through the Interception driver and
//! feeds a virtual controller on ViGEmBus. Both drivers must be installed.
//!
//! Usage: `kbm2pad [profile.toml]`

use anyhow::{bail, Context, Result};
use kbm2pad::backend::{open_controller_sink, open_device_source};
use kbm2pad::mapping::config::{Config, DEFAULT_PROFILE_PATH};
use kbm2pad::EmulatorManager;
use log::info;
use std::path::Path;
use std::time::Duration;

fn load_profile() -> Result<Config> {
    if let Some(path) = std::env::args().nth(1) {
        let config = Config::load(&path).with_context(|| format!("Failed to load profile {}", path))?;
        info!("✓ Loaded profile from {}", path);
        return Ok(config);
    }

    if Path::new(DEFAULT_PROFILE_PATH).exists() {
        let config = Config::load_default()
            .with_context(|| format!("Failed to load profile {}", DEFAULT_PROFILE_PATH))?;
        info!("✓ Loaded profile from {}", DEFAULT_PROFILE_PATH);
        return Ok(config);
    }

    info!("No profile given, using built-in defaults");
    Config::embedded().context("Built-in profile is invalid")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_profile()?;
    let toggle = config
        .toggle_key()
        .map(|key| key.to_string())
        .unwrap_or_default();

    let source = open_device_source().context("Cannot capture keyboard/mouse input")?;
    let sink = open_controller_sink().context("Cannot create the virtual controller")?;

    let mut manager = EmulatorManager::new(config, source, sink);
    manager.start().context("Failed to start the emulator")?;

    info!("Press {} to toggle emulation, Ctrl+C to quit", toggle);

    // One listener for the whole run, so a Ctrl+C between polls is not lost
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let stopped_on_its_own = loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Ctrl+C received");
                break false;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if !manager.is_running() {
                    break true;
                }
            }
        }
    };

    let diagnostics = manager.stop();
    if let Some(diagnostics) = diagnostics {
        info!(
            "{} events ({} suppressed), {} reports, {} failed, {} fallbacks",
            diagnostics.events,
            diagnostics.suppressed,
            diagnostics.submissions,
            diagnostics.submit_failures,
            diagnostics.fallbacks
        );
    }

    if stopped_on_its_own {
        bail!("Input capture stopped unexpectedly, see the log above");
    }
    Ok(())
}
