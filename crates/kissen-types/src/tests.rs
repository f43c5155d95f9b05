use super::*;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use test_case::test_case;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sample {
    name: String,
    value: bool,
    window: TemporalWindow,
}

#[derive(Debug)]
struct Rename(String);

impl Event for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }
}

// ============================================================================
// Timestamp
// ============================================================================

#[test]
fn test_timestamp_arithmetic() {
    let t = Timestamp::from_millis(1_000);
    assert_eq!((t + 500).as_millis(), 1_500);
    assert_eq!(Timestamp::from_millis(1_500) - t, 500);
    assert_eq!(t - Timestamp::from_millis(1_500), 0);
    assert_eq!(Timestamp::from_millis(u64::MAX) + 1, Timestamp::from_millis(u64::MAX));
}

#[test]
fn test_timestamp_display() {
    assert_eq!(Timestamp::EPOCH.to_string(), "1970-01-01T00:00:00.000Z");
    assert_eq!(
        Timestamp::from_millis(1_700_000_000_123).to_string(),
        "2023-11-14T22:13:20.123Z"
    );
}

#[test]
fn test_timestamp_now_after_epoch() {
    assert!(Timestamp::now() > Timestamp::EPOCH);
}

// ============================================================================
// TemporalWindow
// ============================================================================

#[test_case(None, 10_000, true ; "unlimited is always valid")]
#[test_case(Some(1_000), 1_500, true ; "before end")]
#[test_case(Some(1_000), 2_000, false ; "exactly at end")]
#[test_case(Some(1_000), 5_000, false ; "after end")]
fn test_window_validity(duration: Option<u64>, now: u64, expected: bool) {
    let window = TemporalWindow::with_duration(Timestamp::from_millis(1_000), duration);
    assert_eq!(window.is_valid(Timestamp::from_millis(now)), expected);
}

#[test]
fn test_with_end_keeps_predicted_end() {
    let window = TemporalWindow::with_duration(Timestamp::from_millis(0), Some(100));
    let shortened = window.with_end(Some(Timestamp::from_millis(10)));

    assert_eq!(shortened.end, Some(Timestamp::from_millis(10)));
    assert_eq!(shortened.predicted_end, Some(Timestamp::from_millis(100)));
    assert_eq!(shortened.accurate_duration(), Some(10));
    assert_eq!(shortened.duration, Some(100));
}

#[test]
fn test_remaining() {
    let window = TemporalWindow::with_duration(Timestamp::from_millis(0), Some(100));
    assert_eq!(window.remaining(Timestamp::from_millis(40)), Some(60));
    assert_eq!(window.remaining(Timestamp::from_millis(400)), Some(0));
    assert_eq!(TemporalWindow::unlimited(Timestamp::EPOCH).remaining(Timestamp::now()), None);
}

// ============================================================================
// Data codec
// ============================================================================

#[test]
fn test_generate_id_shape() {
    for _ in 0..32 {
        let id = generate_id();
        assert_eq!(id.len(), 4);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[test]
fn test_from_json_rejects_garbage() {
    let err = from_json::<Sample>("{not json").unwrap_err();
    assert!(matches!(err, DataError::Decode { .. }));
}

proptest! {
    #[test]
    fn prop_record_json_roundtrip(
        name in ".{0,32}",
        value: bool,
        start in 0u64..1 << 50,
        duration in proptest::option::of(0u64..1 << 40),
    ) {
        let sample = Sample {
            name,
            value,
            window: TemporalWindow::with_duration(Timestamp::from_millis(start), duration),
        };
        let json = to_json(&sample).unwrap();
        prop_assert_eq!(from_json::<Sample>(&json).unwrap(), sample);
    }
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_bus_listener_can_rewrite_event() {
    let bus = EventBus::new();
    bus.subscribe(|event: &mut Rename| {
        event.0.make_ascii_uppercase();
        EventOutcome::Continue
    });

    let mut event = Rename("admin".to_string());
    assert!(bus.call(&mut event));
    assert_eq!(event.0, "ADMIN");
}

#[test]
fn test_bus_cancel_stops_dispatch() {
    let bus = EventBus::new();
    bus.subscribe(|_: &mut Rename| EventOutcome::Cancel);
    bus.subscribe(|event: &mut Rename| {
        event.0.clear();
        EventOutcome::Continue
    });
    assert_eq!(bus.listener_count(), 2);

    let mut event = Rename("admin".to_string());
    let err = EventCancelled::check(&bus, &mut event).unwrap_err();
    assert_eq!(err.event, "rename");
    assert_eq!(event.0, "admin");
}

#[test]
fn test_noop_dispatcher_accepts() {
    let mut event = Rename("x".to_string());
    assert!(EventCancelled::check(&NoopDispatcher, &mut event).is_ok());
}
