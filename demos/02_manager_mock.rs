//! Example 02: Test manager with mock backends
//!
//! Runs the EmulatorManager on a scripted mock source and a recording mock
//! sink, so nothing is captured from or sent to the real system:
//! 1. Toggle emulation on
//! 2. Walk forward, jump, move the mouse
//! 3. Toggle back to pass-through
//! 4. Print every controller report the sink received

use kbm2pad::backend::{MockSink, MockSource};
use kbm2pad::input::{MouseButton, RawInputEvent};
use kbm2pad::mapping::config::Config;
use kbm2pad::EmulatorManager;
use std::error::Error;
use std::thread;
use std::time::{Duration, Instant};

const GRAVE: u8 = 0x29;
const W: u8 = 0x11;
const SPACE: u8 = 0x39;

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== kbm2pad Manager Test with Mock Backends ===");
    println!();

    let config = match Config::load_default() {
        Ok(cfg) => {
            println!("✓ Loaded profile from configs/default.toml");
            cfg
        }
        Err(e) => {
            println!("⚠️  configs/default.toml not usable ({}), using built-in profile", e);
            Config::embedded()?
        }
    };

    let script = [
        RawInputEvent::key(GRAVE, true),
        RawInputEvent::key(GRAVE, false),
        RawInputEvent::key(W, true),
        RawInputEvent::key(SPACE, true),
        RawInputEvent::key(SPACE, false),
        RawInputEvent::mouse_move(120, -40),
        RawInputEvent::mouse_button(MouseButton::Left, true),
        RawInputEvent::mouse_button(MouseButton::Left, false),
        RawInputEvent::key(W, false),
        RawInputEvent::key(GRAVE, true),
        RawInputEvent::key(GRAVE, false),
        RawInputEvent::key(W, true),
    ];

    let source = MockSource::new();
    let sink = MockSink::new();

    let mut manager = EmulatorManager::new(config, source.clone(), sink.clone());
    let modes = manager.subscribe_mode();

    println!("Starting manager...");
    manager.start()?;

    for event in script {
        source.push(event);
        thread::sleep(Duration::from_millis(20));
    }

    // Let the last decisions and decay ticks land
    let deadline = Instant::now() + Duration::from_secs(2);
    while source.decisions().len() < script.len() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    let diagnostics = manager.stop();

    println!();
    println!("Suppress decisions:");
    for (event, suppressed) in source.decisions() {
        println!("  {:?} -> {}", event.kind, if suppressed { "suppressed" } else { "passed" });
    }

    println!();
    println!("Mode changes:");
    for change in modes.try_iter() {
        println!("  {:?} ({:?})", change.mode, change.cause);
    }

    println!();
    println!("Controller reports: {}", sink.submitted().len());
    for state in sink.submitted() {
        println!("  {:?}", state);
    }

    if let Some(diagnostics) = diagnostics {
        println!();
        println!("{:#?}", diagnostics);
    }

    Ok(())
}
