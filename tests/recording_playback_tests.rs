//! Record into a layer, then play it back through grains.

mod helpers;

use approx::assert_abs_diff_eq;
use helpers::tolerances::*;
use helpers::*;
use layercake::core::{equal_power_gains, Envelope};
use layercake::prelude::*;

/// One second of ramp recorded on layer 0 and replayed by a one-second
/// grain comes back sample for sample, shaped by the grain envelope and
/// centre-panned.
#[test]
fn test_recorded_ramp_plays_back_through_envelope() {
    let mut engine = test_engine();
    let handle = engine.handle();
    let ramp = generate_ramp(44100);

    record_signal(&mut engine, &ramp);
    let layer = handle.layer(0).expect("layer 0");
    assert_eq!(layer.recorded_length(), 44100);
    assert!(layer.has_recorded());

    let grain = GrainState {
        loop_start_seconds: 0.0,
        duration_ms: 1000.0,
        rate_semitones: 0.0,
        play_forward: true,
        ..GrainState::on_layer(0)
    };
    assert!(handle.trigger_grain(grain));
    let (left, right) = render(&mut engine, 44100);

    let mut envelope = Envelope::new(TEST_SAMPLE_RATE);
    envelope.set_times(grain.env_attack_ms, grain.env_release_ms);
    envelope.note_on();
    let (gain_l, gain_r) = equal_power_gains(0.5);
    for i in 0..44100 {
        let expected = ramp[i] * envelope.next_sample();
        assert!(
            (left[i] - expected * gain_l).abs() <= FLOAT_EPSILON,
            "left sample {i}: {} vs {}",
            left[i],
            expected * gain_l
        );
        assert_abs_diff_eq!(right[i], expected * gain_r, epsilon = FLOAT_EPSILON);
    }
    assert_eq!(engine.active_voice_count(), 0);
}

/// A grain that outlives its loop stops when the read cursor wraps.
#[test]
fn test_grain_stops_at_loop_end() {
    let mut engine = test_engine();
    let handle = engine.handle();
    record_signal(&mut engine, &vec![0.5; 44100]);

    handle.trigger_grain(GrainState {
        duration_ms: 10.0,
        env_release_ms: 1000.0,
        ..GrainState::on_layer(0)
    });
    let (left, _) = render(&mut engine, 882);
    assert_has_audio(&left[..441], 0.01);
    assert_silence(&left[441..], SILENCE_THRESHOLD);
}

/// Reverse grains start at the end of their region and walk backwards.
#[test]
fn test_reverse_grain_reads_backwards() {
    let mut engine = test_engine();
    let handle = engine.handle();
    let ramp = generate_ramp(44100);
    record_signal(&mut engine, &ramp);

    handle.trigger_grain(GrainState {
        loop_start_seconds: 0.5,
        duration_ms: 100.0,
        env_attack_ms: 0.0,
        env_release_ms: 100.0,
        play_forward: false,
        ..GrainState::on_layer(0)
    });
    let (left, _) = render(&mut engine, 441);

    let mut envelope = Envelope::new(TEST_SAMPLE_RATE);
    envelope.set_times(0.0, 100.0);
    envelope.note_on();
    let gain = equal_power_gains(0.5).0;
    let start = 22050 + 4410 - 1;
    let expected = ramp[start] * envelope.next_sample() * gain;
    assert_abs_diff_eq!(left[0], expected, epsilon = FLOAT_EPSILON);
    // Envelope falls and the ramp falls, so output falls too.
    assert!(left.windows(2).all(|w| w[1] <= w[0]));
}

/// An octave up reads two recorded samples per output sample.
#[test]
fn test_pitch_shift_changes_read_speed() {
    let mut engine = test_engine();
    let handle = engine.handle();
    let ramp = generate_ramp(44100);
    record_signal(&mut engine, &ramp);

    handle.trigger_grain(GrainState {
        duration_ms: 500.0,
        rate_semitones: 12.0,
        env_attack_ms: 0.0,
        env_release_ms: 500.0,
        pan: 0.0,
        ..GrainState::on_layer(0)
    });
    let (left, _) = render(&mut engine, 200);

    let mut envelope = Envelope::new(TEST_SAMPLE_RATE);
    envelope.set_times(0.0, 500.0);
    envelope.note_on();
    for (i, sample) in left.iter().enumerate() {
        let expected = ramp[i * 2] * envelope.next_sample();
        assert!((sample - expected).abs() < DSP_EPSILON, "sample {i}");
    }
}

/// Re-recording a layer that already holds audio overdubs onto it and
/// keeps the original loop length.
#[test]
fn test_overdub_mixes_with_existing_audio() {
    let mut engine = test_engine_with(LayerCakeEngine::builder().overdub_mix(0.5));
    let handle = engine.handle();

    record_signal(&mut engine, &vec![0.4; 44100]);
    record_signal(&mut engine, &vec![0.1; 22050]);

    let layer = handle.layer(0).expect("layer 0");
    assert_abs_diff_eq!(layer.read(100), 0.1 + 0.4 * 0.5, epsilon = FLOAT_EPSILON);
    assert_abs_diff_eq!(layer.read(30000), 0.4, epsilon = FLOAT_EPSILON);
    assert_eq!(layer.recorded_length(), 44100);
}

/// Each layer records independently.
#[test]
fn test_layers_record_independently() {
    let mut engine = test_engine();
    let handle = engine.handle();

    record_signal(&mut engine, &vec![0.3; 4410]);
    handle.set_record_layer(2).expect("layer 2");
    record_signal(&mut engine, &vec![0.6; 8820]);

    assert_eq!(handle.layer(0).map(|l| l.recorded_length()), Some(4410));
    assert_eq!(handle.layer(2).map(|l| l.recorded_length()), Some(8820));
    assert!(handle.layer(1).is_some_and(|l| !l.has_audio()));
}

/// Recording stops at the layer's capacity; the loop length is clamped.
#[test]
fn test_recording_clamps_to_layer_capacity() {
    let mut engine = test_engine_with(LayerCakeEngine::builder().max_layer_duration_secs(0.5));
    let handle = engine.handle();
    record_signal(&mut engine, &generate_sine(220.0, TEST_SAMPLE_RATE, 44100));

    let layer = handle.layer(0).expect("layer 0");
    assert_eq!(layer.capacity(), 22050);
    assert_eq!(layer.recorded_length(), 22050);
}

/// Master gain applies after voice summing.
#[test]
fn test_master_gain_applies_to_mix() {
    let mut engine = test_engine_with(LayerCakeEngine::builder().master_gain_db(-6.0));
    let handle = engine.handle();
    record_signal(&mut engine, &vec![1.0; 4410]);

    handle.trigger_grain(GrainState {
        duration_ms: 50.0,
        env_attack_ms: 0.0,
        env_release_ms: 100.0,
        pan: 0.0,
        ..GrainState::on_layer(0)
    });
    let (left, _) = render(&mut engine, 1);
    let expected = 10.0_f32.powf(-6.0 / 20.0) * (1.0 - 1.0 / 4410.0);
    assert_abs_diff_eq!(left[0], expected, epsilon = DSP_EPSILON);
}
