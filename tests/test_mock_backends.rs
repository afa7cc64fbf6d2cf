//! Integration tests for mock backends

use kbm2pad::backend::{ControllerSink, DeviceSource, MockSink, MockSource};
use kbm2pad::gamepad::{Button, ControllerState};
use kbm2pad::input::{MouseButton, RawInputEvent};
use std::time::Duration;

#[test]
fn test_mock_source_records_decisions() {
    let mut source = MockSource::with_events([
        RawInputEvent::key(0x11, true),
        RawInputEvent::mouse_move(10, -5),
        RawInputEvent::mouse_button(MouseButton::Left, true),
    ]);

    let mut expected = Vec::new();
    while let Some(event) = source.next_event(Duration::ZERO).unwrap() {
        let suppress = expected.len() % 2 == 0;
        source.set_suppressed(&event, suppress).unwrap();
        expected.push((event, suppress));
    }

    assert_eq!(source.decisions(), expected);
}

#[test]
fn test_mock_sink_records_reports() {
    let mut sink = MockSink::new();

    let mut state = ControllerState::neutral();
    state.buttons.set(Button::A, true);

    assert!(sink.submit(&ControllerState::neutral()).is_ok());
    assert!(sink.submit(&state).is_ok());
    assert!(sink.close().is_ok());

    assert_eq!(sink.submitted(), vec![ControllerState::neutral(), state]);
    assert!(sink.is_closed());
}

#[test]
fn test_mock_backends_are_clone() {
    let source1 = MockSource::new();
    let source2 = source1.clone();

    let mut sink1 = MockSink::new();
    let sink2 = sink1.clone();

    // Clones share their record
    source1.push(RawInputEvent::wheel(1));
    assert_eq!(source2.remaining(), 1);

    sink1.submit(&ControllerState::neutral()).unwrap();
    assert_eq!(sink2.submitted().len(), 1);
}

#[test]
fn test_boxed_backends() {
    let mut source: Box<dyn DeviceSource + Send> =
        Box::new(MockSource::with_events([RawInputEvent::key(0x1E, true)]));
    let mut sink: Box<dyn ControllerSink + Send> = Box::new(MockSink::new());

    let event = source.next_event(Duration::ZERO).unwrap().unwrap();
    assert!(source.set_suppressed(&event, true).is_ok());
    assert!(sink.submit(&ControllerState::neutral()).is_ok());
}
