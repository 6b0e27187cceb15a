//! Pattern clock driven through the engine: record a pattern, replay it,
//! restore it elsewhere.

mod helpers;

use approx::assert_abs_diff_eq;
use helpers::tolerances::*;
use helpers::*;
use layercake::prelude::*;

const PERIOD_MS: f64 = 100.0;
const PERIOD_SAMPLES: usize = 4410;
const STEPS: usize = 4;
const CYCLE: usize = PERIOD_SAMPLES * STEPS;
/// Ticks land on the last sample of each period, so the final grain of a
/// cycle rings into the start of the next one.
const SPILL: usize = 1000;

/// Each call moves the grain further into the layer.
fn stepping_builder() -> GrainBuilder {
    let mut calls = 0_usize;
    Box::new(move || {
        let state = GrainState {
            loop_start_seconds: 0.1 + 0.2 * (calls % STEPS) as f32,
            duration_ms: 20.0,
            env_release_ms: 10.0,
            ..GrainState::on_layer(0)
        };
        calls += 1;
        state
    })
}

/// Engine with one second of ramp on layer 0 and the stepping builder.
fn loaded_engine() -> LayerCakeEngine {
    let mut engine = test_engine();
    record_signal(&mut engine, &generate_ramp(44100));
    engine.pattern_clock_mut().set_grain_builder(stepping_builder());
    engine
}

fn start_recording(handle: &EngineHandle) {
    let clock = handle.pattern_clock();
    clock.set_enabled(true);
    clock.request_pattern_length(STEPS);
    clock.request_period_ms(PERIOD_MS);
    clock.request_mode(ClockMode::Recording);
}

/// A recorded pattern switches to playback when full and then repeats
/// the recorded pass exactly, cycle after cycle.
#[test]
fn test_recorded_pattern_replays_identically() {
    let mut engine = loaded_engine();
    let handle = engine.handle();
    start_recording(&handle);

    let (recorded, _) = render(&mut engine, CYCLE);
    assert_eq!(handle.pattern_clock().mode(), ClockMode::Playback);
    assert_eq!(engine.pattern_clock().recorded_steps(), 0);
    assert_has_audio(&recorded, 0.01);

    let (first, _) = render(&mut engine, CYCLE);
    assert_eq!(first[SPILL..], recorded[SPILL..]);
    for cycle in 1..3 {
        let (played, _) = render(&mut engine, CYCLE);
        assert_eq!(played, first, "cycle {cycle} diverged");
    }
    assert_eq!(handle.pattern_clock().current_step(), 0);
}

/// Recorded steps keep what the builder produced, armed.
#[test]
fn test_recorded_steps_store_built_states() {
    let mut engine = loaded_engine();
    start_recording(&engine.handle());
    render(&mut engine, CYCLE);

    let clock = engine.pattern_clock();
    for step in 0..STEPS {
        let state = clock.step(step).expect("recorded step");
        assert!(state.should_trigger);
        assert_abs_diff_eq!(
            state.loop_start_seconds,
            0.1 + 0.2 * step as f32,
            epsilon = FLOAT_EPSILON
        );
    }
    assert!(clock.step(STEPS).is_some_and(|s| !s.should_trigger));
}

/// With every step skipped, playback stays silent but keeps counting.
#[test]
fn test_full_skip_probability_silences_playback() {
    let mut engine = loaded_engine();
    let handle = engine.handle();
    start_recording(&handle);
    render(&mut engine, CYCLE);

    handle.pattern_clock().request_skip_probability(1.0);
    let (played, _) = render(&mut engine, PERIOD_SAMPLES * 3);
    assert_silence(&played[SPILL..], SILENCE_THRESHOLD);
    assert_eq!(handle.pattern_clock().current_step(), 3);
}

/// A snapshot survives JSON and replays the same audio on another engine
/// holding the same layer.
#[test]
fn test_snapshot_restores_pattern_on_another_engine() {
    let mut source = loaded_engine();
    start_recording(&source.handle());
    render(&mut source, CYCLE);
    let (expected, _) = render(&mut source, CYCLE);

    let json = serde_json::to_string(&source.pattern_clock().snapshot()).expect("serialize");
    let snapshot: PatternSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert!(snapshot.enabled);
    assert_eq!(snapshot.pattern_length, STEPS);

    let mut target = test_engine();
    let layer = source.handle().capture_layer_snapshot(0).expect("layer snapshot");
    target.handle().apply_layer_snapshot(0, &layer).expect("apply layer");
    target.handle().pattern_clock().request_snapshot(snapshot);

    let (played, _) = render(&mut target, CYCLE);
    assert_eq!(target.pattern_clock().mode(), ClockMode::Playback);
    assert_eq!(played[SPILL..], expected[SPILL..]);
}

/// Idle ticks play freshly built grains and remember the latest one as
/// the auto-fire state.
#[test]
fn test_idle_ticks_play_and_store_live_state() {
    let mut engine = loaded_engine();
    let handle = engine.handle();
    handle.pattern_clock().set_enabled(true);
    handle.pattern_clock().request_period_ms(PERIOD_MS);

    let (out, _) = render(&mut engine, PERIOD_SAMPLES * 2);
    assert_has_audio(&out, 0.01);
    assert_eq!(engine.pattern_clock().mode(), ClockMode::Idle);
    let stored = handle.pattern_clock().auto_fire_state();
    assert_abs_diff_eq!(stored.loop_start_seconds, 0.3, epsilon = FLOAT_EPSILON);
}

/// Unrecorded playback steps fall back to the auto-fire state only when
/// auto-fire is on.
#[test]
fn test_auto_fire_fills_empty_steps() {
    let empty_pattern = PatternSnapshot {
        pattern_length: STEPS,
        period_ms: PERIOD_MS,
        enabled: true,
        ..Default::default()
    };
    let fallback = GrainState {
        duration_ms: 20.0,
        env_release_ms: 10.0,
        ..GrainState::on_layer(0)
    };

    let mut engine = test_engine();
    record_signal(&mut engine, &vec![0.5; 44100]);
    let handle = engine.handle();
    handle.pattern_clock().set_auto_fire_state(fallback);
    handle.pattern_clock().request_snapshot(empty_pattern.clone());
    let (silent, _) = render(&mut engine, CYCLE);
    assert_silence(&silent, SILENCE_THRESHOLD);

    handle.pattern_clock().set_auto_fire_enabled(true);
    let (filled, _) = render(&mut engine, CYCLE);
    assert_has_audio(&filled, 0.1);
}

/// A disabled clock neither advances its step nor fires, but keeps time.
#[test]
fn test_disabled_clock_holds_position() {
    let mut engine = loaded_engine();
    let handle = engine.handle();
    start_recording(&handle);
    render(&mut engine, PERIOD_SAMPLES * 2);
    assert_eq!(handle.pattern_clock().current_step(), 2);

    handle.pattern_clock().set_enabled(false);
    let (out, _) = render(&mut engine, CYCLE + SPILL);
    assert_silence(&out[SPILL..], SILENCE_THRESHOLD);
    assert_eq!(handle.pattern_clock().current_step(), 2);
    assert_eq!(engine.pattern_clock().mode(), ClockMode::Recording);

    // The metronome kept counting, so the next tick is SPILL samples early.
    handle.pattern_clock().set_enabled(true);
    render(&mut engine, PERIOD_SAMPLES - SPILL - 1);
    assert_eq!(handle.pattern_clock().current_step(), 2);
    render(&mut engine, 1);
    assert_eq!(handle.pattern_clock().current_step(), 3);
}
