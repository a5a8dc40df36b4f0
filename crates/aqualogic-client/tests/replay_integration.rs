//! End-to-end tests: synthesised bus captures replayed through the engine.

use std::time::Duration;

use aqualogic_client::application::engine::{AquaLogic, EngineConfig, EngineError};
use aqualogic_client::application::snapshot::{ChangeSet, Field};
use aqualogic_client::infrastructure::transport::MemoryStream;
use aqualogic_core::{encode_frame, encode_key_frame, FrameType, Key, State};

// ── Capture builders ──────────────────────────────────────────────────────────

fn keep_alive() -> Vec<u8> {
    encode_frame(FrameType::KeepAlive, &[])
}

fn leds(states: &[State]) -> Vec<u8> {
    let current = states.iter().fold(0u32, |acc, s| acc | s.bit());
    let mut body = current.to_le_bytes().to_vec();
    body.extend_from_slice(&0u32.to_le_bytes());
    encode_frame(FrameType::Leds, &body)
}

fn display(text: &[u8]) -> Vec<u8> {
    let mut body = text.to_vec();
    body.push(0);
    encode_frame(FrameType::DisplayUpdate, &body)
}

/// A metric capture with `body_state` and the filter on, readings on the LCD.
///
/// The panel cycles the spa chlorinator screen in either mode.
fn pool_capture(body_state: State) -> Vec<u8> {
    let water: &[u8] = match body_state {
        State::Spa => b"  Spa Temp   -7\xDFC ",
        _ => b"  Pool Temp   -7\xDFC ",
    };

    [
        keep_alive(),
        leds(&[body_state, State::Filter]),
        display(b"  Air Temp   -6\xDFC "),
        keep_alive(),
        display(water),
        display(b"  Spa Chlorinator   3% "),
        display(b"  Salt Level   3.1 g/L "),
        keep_alive(),
    ]
    .concat()
}

async fn replay(bytes: Vec<u8>) -> (aqualogic_client::AquaLogicHandle, Vec<ChangeSet>) {
    let mut engine = AquaLogic::connect(MemoryStream::new(bytes))
        .await
        .expect("connect");
    let handle = engine.handle();
    let mut seen = Vec::new();
    engine
        .process(|changes| seen.push(changes.clone()))
        .await
        .expect("process");
    (handle, seen)
}

// ── Decoding ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_pool_capture_populates_readings_and_states() {
    // Act
    let (handle, _) = replay(pool_capture(State::Pool)).await;

    // Assert
    assert_eq!(handle.is_metric(), Some(true));
    assert_eq!(handle.air_temp(), Some(-6));
    assert_eq!(handle.pool_temp(), Some(-7));
    assert_eq!(handle.spa_temp(), None);
    assert_eq!(handle.spa_chlorinator_percent(), Some(3));
    assert_eq!(handle.pool_chlorinator_percent(), None);
    assert_eq!(handle.salt_level(), Some(3.1));
    assert!(handle.get_state(State::Pool));
    assert!(handle.get_state(State::Filter));
    assert!(!handle.get_state(State::Spa));
    assert_eq!(handle.status(), "Ok");
}

#[tokio::test]
async fn test_spa_capture_mirrors_pool_capture() {
    let (handle, _) = replay(pool_capture(State::Spa)).await;

    assert_eq!(handle.spa_temp(), Some(-7));
    assert_eq!(handle.pool_temp(), None);
    assert_eq!(handle.spa_chlorinator_percent(), Some(3));
    assert_eq!(handle.pool_chlorinator_percent(), None);
    assert!(handle.get_state(State::Spa));
    assert!(!handle.get_state(State::Pool));
}

#[tokio::test]
async fn test_each_frame_reports_its_changes_once() {
    // Act
    let (_, seen) = replay(pool_capture(State::Pool)).await;

    // Assert – keep-alives report nothing
    let fields: Vec<Vec<Field>> = seen
        .iter()
        .map(|c| c.iter().map(|change| change.field).collect())
        .collect();
    assert_eq!(fields[0], vec![Field::States]);
    assert_eq!(fields[1], vec![Field::Display, Field::AirTemp, Field::IsMetric]);
    assert_eq!(fields[2], vec![Field::Display, Field::PoolTemp]);
    assert_eq!(seen.len(), 5);
}

#[tokio::test]
async fn test_identical_leds_frame_fires_one_callback() {
    let bytes = [leds(&[State::Lights]), leds(&[State::Lights])].concat();

    let (_, seen) = replay(bytes).await;

    assert_eq!(seen.len(), 1);
}

#[tokio::test]
async fn test_noise_before_first_frame_is_skipped() {
    let bytes = [vec![0x03, 0x55, 0x10, 0x55], leds(&[State::Aux2])].concat();

    let (handle, _) = replay(bytes).await;

    assert!(handle.waterfall());
}

// ── Commands ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_keep_alive_bursts_queued_command() {
    // Arrange
    let stream = MemoryStream::new([leds(&[]), keep_alive()].concat());
    let writes = stream.writes();
    let mut engine = AquaLogic::connect(stream).await.expect("connect");
    let handle = engine.handle();
    assert!(handle.set_state(State::Lights, true));

    // Act
    engine.process(|_| {}).await.expect("process");

    // Assert
    let log = writes.lock().expect("write log").clone();
    assert_eq!(log.len(), 5);
    assert!(log.iter().all(|w| *w == encode_key_frame(Key::Lights)));
    assert!(handle.is_attempting_request());
    assert!(handle.get_state(State::Lights));
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_command_is_resent_on_next_keep_alive() {
    // Arrange – lights never come on
    let stream = MemoryStream::new([leds(&[]), keep_alive()].concat())
        .then_after(Duration::from_secs(3), keep_alive());
    let writes = stream.writes();
    let mut engine = AquaLogic::connect(stream).await.expect("connect");
    let handle = engine.handle();
    handle.set_state(State::Lights, true);

    // Act
    engine.process(|_| {}).await.expect("process");

    // Assert
    assert_eq!(writes.lock().expect("write log").len(), 10);
    assert!(handle.is_attempting_request());
}

#[tokio::test(start_paused = true)]
async fn test_command_is_abandoned_when_retries_run_out() {
    // Arrange
    let config = EngineConfig {
        command_retries: 1,
        ..EngineConfig::default()
    };
    let stream = MemoryStream::new([leds(&[]), keep_alive()].concat());
    let mut engine = AquaLogic::connect_with(stream, config)
        .await
        .expect("connect");
    let handle = engine.handle();
    handle.set_state(State::Lights, true);

    // Act
    engine.process(|_| {}).await.expect("process");
    tokio::time::sleep(Duration::from_secs(3)).await;

    // Assert
    assert!(!handle.is_attempting_request());
    assert!(!handle.get_state(State::Lights));
}

#[tokio::test(start_paused = true)]
async fn test_leds_confirmation_completes_command() {
    // Arrange
    let stream = MemoryStream::new([leds(&[]), keep_alive()].concat())
        .then_after(Duration::from_secs(1), leds(&[State::Lights]));
    let mut engine = AquaLogic::connect(stream).await.expect("connect");
    let handle = engine.handle();
    handle.set_state(State::Lights, true);

    // Act
    engine.process(|_| {}).await.expect("process");

    // Assert
    assert!(!handle.is_attempting_request());
    assert!(handle.get_state(State::Lights));
}

#[tokio::test(start_paused = true)]
async fn test_late_confirmation_cancels_requeued_command() {
    // Arrange – the LEDs catch up after the 2 s check, before the next keep-alive
    let stream = MemoryStream::new([leds(&[]), keep_alive()].concat())
        .then_after(Duration::from_millis(2500), leds(&[State::Lights]))
        .then_after(Duration::from_secs(1), keep_alive());
    let writes = stream.writes();
    let mut engine = AquaLogic::connect(stream).await.expect("connect");
    let handle = engine.handle();
    handle.set_state(State::Lights, true);

    // Act
    engine.process(|_| {}).await.expect("process");

    // Assert – a second burst would toggle the lights back off
    assert_eq!(writes.lock().expect("write log").len(), 5);
    assert!(!handle.is_attempting_request());
    assert!(handle.get_state(State::Lights));
}

#[tokio::test(start_paused = true)]
async fn test_set_state_already_satisfied_sends_nothing() {
    let stream = MemoryStream::new([leds(&[State::Lights]), keep_alive()].concat());
    let writes = stream.writes();
    let mut engine = AquaLogic::connect(stream).await.expect("connect");
    let handle = engine.handle();

    engine.process(|_| {}).await.expect("process");

    assert!(handle.set_state(State::Lights, true));
    assert!(!handle.is_attempting_request());
    assert!(writes.lock().expect("write log").is_empty());
}

// ── Termination ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_close_ends_processing() {
    // Arrange
    let stream = MemoryStream::new(keep_alive()).hold_open();
    let mut engine = AquaLogic::connect(stream).await.expect("connect");
    let handle = engine.handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.close();
    });

    // Act
    let result = engine.process(|_| {}).await;

    // Assert
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_silent_bus_times_out() {
    let stream = MemoryStream::new(keep_alive()).hold_open();
    let mut engine = AquaLogic::connect(stream).await.expect("connect");

    let result = engine.process(|_| {}).await;

    assert!(matches!(result, Err(EngineError::ReadTimeout(d)) if d == Duration::from_secs(5)));
}
