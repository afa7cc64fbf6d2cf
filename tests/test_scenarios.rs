//! End-to-end translation scenarios through the pipeline and a mock sink

use kbm2pad::backend::{ControllerSink, MockSink, OffloadedSink, RetryPolicy};
use kbm2pad::gamepad::{ControllerState, StickPosition};
use kbm2pad::input::{EngineEvent, MouseButton, RawInputEvent};
use kbm2pad::mapping::{Config, ControllerMode, Pipeline};
use std::thread;
use std::time::{Duration, Instant};

const GRAVE: u8 = 0x29;
const W: u8 = 0x11;
const S: u8 = 0x1F;
const UNBOUND: u8 = 0x56;

const PROFILE: &str = r#"
    [settings]
    max_submit_failures = 3

    [mouse]
    stick = "right"
    deadzone = 5.0
    range = 100.0
    exponent = 1.0
    half_life_ms = 40

    [binds]
    grave = { type = "toggle" }
    w = { type = "direction", stick = "left", direction = "up" }
    s = { type = "direction", stick = "left", direction = "down" }
    space = { type = "button", button = "a" }
    mouse_left = { type = "trigger", trigger = "right" }
"#;

fn pipeline() -> (Pipeline<MockSink>, MockSink) {
    let sink = MockSink::new();
    let config = Config::from_toml_str(PROFILE).unwrap();
    (Pipeline::new(&config, sink.clone()).unwrap(), sink)
}

fn key(code: u8, pressed: bool) -> EngineEvent {
    EngineEvent::Input(RawInputEvent::key(code, pressed))
}

fn toggle<S: ControllerSink>(p: &mut Pipeline<S>) {
    assert!(p.process(&key(GRAVE, true)));
    assert!(p.process(&key(GRAVE, false)));
}

fn mixed_events() -> Vec<EngineEvent> {
    vec![
        key(W, true),
        key(UNBOUND, true),
        EngineEvent::Input(RawInputEvent::mouse_move(30, -12)),
        EngineEvent::Input(RawInputEvent::mouse_button(MouseButton::Left, true)),
        EngineEvent::Input(RawInputEvent::wheel(-1)),
        EngineEvent::Input(RawInputEvent::mouse_button(MouseButton::Left, false)),
        key(UNBOUND, false),
        key(W, false),
    ]
}

#[test]
fn passthrough_suppresses_only_the_toggle_key() {
    let (mut p, sink) = pipeline();

    for event in mixed_events() {
        assert!(!p.process(&event), "{:?} was suppressed", event);
    }
    assert!(sink.submitted().is_empty());

    assert!(p.process(&key(GRAVE, true)));
    assert!(p.process(&key(GRAVE, false)));
}

#[test]
fn emulation_suppresses_every_event() {
    let (mut p, _sink) = pipeline();
    toggle(&mut p);
    assert_eq!(p.mode(), ControllerMode::Emulation);

    for event in mixed_events() {
        assert!(p.process(&event), "{:?} was not suppressed", event);
    }
    assert_eq!(p.diagnostics().unmapped_events, 3);
}

#[test]
fn toggling_twice_round_trips() {
    let (mut p, _sink) = pipeline();
    let start = p.mode();
    toggle(&mut p);
    toggle(&mut p);
    assert_eq!(p.mode(), start);
}

#[test]
fn opposite_directions_cancel_until_one_is_released() {
    let (mut p, _sink) = pipeline();
    toggle(&mut p);

    p.process(&key(W, true));
    p.process(&key(S, true));
    assert_eq!(p.state().left_stick.y, 0.0);

    p.process(&key(S, false));
    assert_eq!(p.state().left_stick, StickPosition { x: 0.0, y: 1.0 });
}

#[test]
fn forward_key_scenario() {
    let (mut p, sink) = pipeline();

    p.process(&key(GRAVE, true));
    assert_eq!(p.mode(), ControllerMode::Emulation);
    p.process(&key(GRAVE, false));

    assert!(p.process(&key(W, true)));
    assert_eq!(sink.last().unwrap().left_stick, StickPosition { x: 0.0, y: 1.0 });

    assert!(p.process(&key(W, false)));
    assert_eq!(sink.last().unwrap().left_stick, StickPosition::CENTER);

    let before = sink.submitted().len();
    p.process(&key(GRAVE, true));
    assert_eq!(p.mode(), ControllerMode::Passthrough);
    let after = sink.submitted();
    assert_eq!(after.len(), before + 1);
    assert_eq!(after.last(), Some(&ControllerState::neutral()));
    p.process(&key(GRAVE, false));

    assert!(!p.process(&key(W, true)));
    assert_eq!(sink.submitted().len(), before + 1);
}

#[test]
fn large_mouse_motion_clamps_to_full_deflection() {
    let (mut p, _sink) = pipeline();
    toggle(&mut p);

    assert!(p.process(&EngineEvent::Input(RawInputEvent::mouse_move(500, 0))));
    assert_eq!(p.state().right_stick.x, 1.0);
    assert_eq!(p.state().right_stick.y, 0.0);
}

#[test]
fn mouse_motion_below_deadzone_is_zero() {
    let (mut p, _sink) = pipeline();
    toggle(&mut p);

    p.process(&EngineEvent::Input(RawInputEvent::mouse_move(3, 0)));
    assert_eq!(p.state().right_stick, StickPosition::CENTER);

    p.process(&EngineEvent::Input(RawInputEvent::mouse_move(-8, 0)));
    assert!(p.state().right_stick.x < 0.0);
}

#[test]
fn ticks_bring_mouse_stick_back_to_center() {
    let (mut p, sink) = pipeline();
    toggle(&mut p);

    let t0 = Instant::now();
    p.process(&EngineEvent::Input(RawInputEvent::mouse_move(500, 0).at(t0)));
    assert_eq!(p.state().right_stick.x, 1.0);

    let mut previous = 1.0;
    for n in 1..=40 {
        p.process(&EngineEvent::Tick { at: t0 + Duration::from_millis(8 * n) });
        let x = p.state().right_stick.x;
        assert!(x <= previous);
        previous = x;
    }

    assert_eq!(p.state().right_stick, StickPosition::CENTER);
    assert_eq!(sink.last().unwrap().right_stick, StickPosition::CENTER);
}

#[test]
fn failing_sink_falls_back_to_passthrough() {
    let (mut p, sink) = pipeline();
    toggle(&mut p);

    sink.set_failing(true);
    p.process(&key(W, true));
    p.process(&key(W, false));
    assert_eq!(p.mode(), ControllerMode::Emulation);
    p.process(&key(W, true));

    assert_eq!(p.mode(), ControllerMode::Passthrough);
    assert_eq!(p.diagnostics().submit_failures, 3);
    assert_eq!(p.diagnostics().fallbacks, 1);
    assert!(p.diagnostics().last_fallback_reason.is_some());

    assert!(!p.process(&key(W, false)));
    assert!(!p.process(&key(S, true)));
    assert!(!p.process(&EngineEvent::Input(RawInputEvent::mouse_move(40, 0))));
}

#[test]
fn failing_worker_sink_falls_back_under_fast_motion() {
    let sink = MockSink::new();
    sink.set_failing(true);
    let offloaded = OffloadedSink::spawn(sink.clone(), RetryPolicy::default()).unwrap();

    let config = Config::from_toml_str(PROFILE).unwrap();
    let mut p = Pipeline::new(&config, offloaded).unwrap();
    toggle(&mut p);

    // Every move changes the stick, so every event submits
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut dx = 200;
    while p.mode() == ControllerMode::Emulation && Instant::now() < deadline {
        p.process(&EngineEvent::Input(RawInputEvent::mouse_move(dx, 0)));
        dx = -dx;
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(p.mode(), ControllerMode::Passthrough);
    assert_eq!(p.diagnostics().fallbacks, 1);
    assert!(p.diagnostics().submit_failures >= 3);
    assert!(!p.process(&EngineEvent::Input(RawInputEvent::mouse_move(200, 0))));

    p.shutdown();
    assert!(sink.is_closed());
}
