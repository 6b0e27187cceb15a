//! Manual and LFO-driven triggers, with spread and direction randomization.

mod helpers;

use helpers::tolerances::*;
use helpers::*;
use layercake::prelude::*;
use layercake::NUM_VOICES;

fn template(loop_start_seconds: f32) -> GrainState {
    GrainState {
        loop_start_seconds,
        duration_ms: 100.0,
        env_release_ms: 400.0,
        ..GrainState::on_layer(0)
    }
}

fn beat_square(division: f32) -> LfoSlotConfig {
    LfoSlotConfig {
        settings: LfoSettings {
            shape: LfoShape::Square,
            clock_division: division,
            phase_offset: 0.5,
            ..Default::default()
        },
        enabled: true,
    }
}

/// Spread moves each manual grain's start within `spread / 2` of the
/// recording either side of the template, never past where it fits.
#[test]
fn test_manual_spread_stays_in_range() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &generate_ramp(44100));
    handle.set_manual_grain_template(GrainState {
        spread_amount: 0.5,
        ..template(0.4)
    });

    for _ in 0..8 {
        assert!(engine.fire_manual_trigger());
    }
    let starts: Vec<f32> = (0..8)
        .filter_map(|i| engine.voices().voice(i))
        .map(|voice| voice.state().loop_start_seconds)
        .collect();
    assert!(starts.iter().all(|&s| (0.149..=0.651).contains(&s)));
    assert!(starts.iter().any(|&s| (s - 0.4).abs() > FLOAT_EPSILON));
}

/// Without spread the template plays as given.
#[test]
fn test_manual_without_spread_is_exact() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &generate_ramp(44100));
    handle.set_manual_grain_template(template(0.4));

    handle.request_manual_trigger();
    render(&mut engine, 1);
    let voice = engine.voices().voice(0).expect("voice 0");
    assert_eq!(voice.state().loop_start_seconds, 0.4);
    assert!(voice.state().play_forward);
}

/// A reverse probability of one flips every manual grain.
#[test]
fn test_manual_reverse_probability() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &generate_ramp(44100));
    handle.set_manual_grain_template(template(0.2));
    handle.set_manual_reverse_probability(1.0);

    for _ in 0..4 {
        handle.request_manual_trigger();
    }
    render(&mut engine, 1);
    assert_eq!(engine.active_voice_count(), 4);
    assert!((0..4).all(|i| engine
        .voices()
        .voice(i)
        .is_some_and(|v| !v.state().play_forward)));
}

/// Manual requests beyond the pool size steal rather than queue.
#[test]
fn test_manual_burst_fills_pool() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &generate_ramp(44100));
    handle.set_manual_grain_template(template(0.2));

    for _ in 0..NUM_VOICES + 4 {
        handle.request_manual_trigger();
    }
    render(&mut engine, 1);
    assert_eq!(engine.active_voice_count(), NUM_VOICES);
}

/// A beat-clocked trigger LFO fires the template on its rising edge:
/// one cycle per beat, half a cycle late, is beat 0.5, which is 11025
/// samples at 120 BPM. Each block reads the transport after advancing it,
/// so the edge lands one block early.
#[test]
fn test_clocked_trigger_lfo_fires_on_beat() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &vec![0.5; 44100]);
    handle.reset_transport();
    handle.set_manual_grain_template(template(0.0));
    handle.update_lfo_slot(0, beat_square(1.0)).expect("slot 0");
    handle.set_trigger_lfo(Some(0)).expect("slot 0");

    let (left, _) = render(&mut engine, 22050);
    let edge = 11025 - TEST_BUFFER_SIZE;
    assert_silence(&left[..edge - 100], SILENCE_THRESHOLD);
    assert_has_audio(&left[edge..edge + 882], 0.05);
    assert_eq!(handle.lfo_visual_value(0), 1.0);
}

/// A stopped transport freezes clocked LFOs, so nothing fires.
#[test]
fn test_stopped_transport_holds_clocked_lfo() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &vec![0.5; 44100]);
    handle.reset_transport();
    handle.set_transport_playing(false);
    handle.set_manual_grain_template(template(0.0));
    handle.update_lfo_slot(0, beat_square(1.0)).expect("slot 0");
    handle.set_trigger_lfo(Some(0)).expect("slot 0");

    let (left, _) = render(&mut engine, 44100);
    assert_silence(&left, SILENCE_THRESHOLD);
    assert_eq!(handle.master_beats(), 0.0);
}

/// Disabling the slot or clearing the trigger source stops LFO grains.
#[test]
fn test_trigger_lfo_can_be_disabled() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &vec![0.5; 44100]);
    handle.set_manual_grain_template(template(0.0));
    handle.update_lfo_slot(3, beat_square(4.0)).expect("slot 3");
    handle.set_trigger_lfo(Some(3)).expect("slot 3");
    handle.set_lfo_enabled(3, false).expect("slot 3");

    let (left, _) = render(&mut engine, 22050);
    assert_silence(&left, SILENCE_THRESHOLD);

    handle.set_lfo_enabled(3, true).expect("slot 3");
    handle.set_trigger_lfo(None).expect("no trigger");
    assert_eq!(handle.trigger_lfo(), None);
    let (left, _) = render(&mut engine, 22050);
    assert_silence(&left, SILENCE_THRESHOLD);
    assert!(handle.lfo_visual_value(3).abs() > 0.0);
}

/// Invalid slot indices are rejected.
#[test]
fn test_invalid_lfo_slots_rejected() {
    let engine = test_engine();
    let handle = engine.handle();
    assert!(handle.update_lfo_slot(8, beat_square(1.0)).is_err());
    assert!(handle.set_lfo_enabled(8, true).is_err());
    assert!(handle.set_trigger_lfo(Some(8)).is_err());
}

/// Handle-side randomization helpers respect the same bounds.
#[test]
fn test_handle_randomization_helpers() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &generate_ramp(44100));

    for _ in 0..32 {
        let mut state = template(0.4);
        handle.apply_spread_randomization(&mut state, 1.0);
        assert!((0.0..=0.9).contains(&state.loop_start_seconds));
    }

    let mut state = template(0.4);
    handle.apply_direction_randomization(&mut state, 1.0);
    assert!(!state.play_forward);
    handle.apply_direction_randomization(&mut state, 0.0);
    assert!(state.play_forward);
}
