//! Test helpers and fixtures for LayerCake integration tests.
//!
//! Every engine is driven block by block from the test thread, so output
//! is deterministic and no audio device is needed.
//!
//! Use the tolerance that matches the operation, see [`tolerances`].

#![allow(dead_code)]

pub mod tolerances;

use layercake::prelude::*;

/// Default test sample rate.
pub const TEST_SAMPLE_RATE: f64 = 44100.0;

/// Block size used by [`render`] and [`record_signal`]. Divides one second.
pub const TEST_BUFFER_SIZE: usize = 441;
pub const TEST_OUTPUT_CHANNELS: usize = 2;

/// Seeded engine prepared at [`TEST_SAMPLE_RATE`].
pub fn test_engine() -> LayerCakeEngine {
    test_engine_with(LayerCakeEngine::builder())
}

/// Prepares `builder` with a fixed seed at [`TEST_SAMPLE_RATE`].
pub fn test_engine_with(builder: EngineBuilder) -> LayerCakeEngine {
    let mut engine = builder.seed(0x5EED).build().expect("Failed to create test engine");
    engine.prepare(TEST_SAMPLE_RATE, TEST_BUFFER_SIZE, TEST_OUTPUT_CHANNELS);
    engine
}

/// Linear ramp from 0 towards 1: sample `i` is `i / num_samples`.
pub fn generate_ramp(num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| i as f32 / num_samples as f32)
        .collect()
}

/// Sine wave at `frequency`.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Renders `num_samples` of stereo output with no input, block by block.
pub fn render(engine: &mut LayerCakeEngine, num_samples: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = Vec::with_capacity(num_samples);
    let mut right = Vec::with_capacity(num_samples);
    let mut remaining = num_samples;
    while remaining > 0 {
        let n = remaining.min(TEST_BUFFER_SIZE);
        let mut l = vec![0.0; n];
        let mut r = vec![0.0; n];
        engine.process_block(&[], &mut [l.as_mut_slice(), r.as_mut_slice()], n);
        left.extend_from_slice(&l);
        right.extend_from_slice(&r);
        remaining -= n;
    }
    (left, right)
}

/// Feeds `signal` through the engine as mono input, block by block.
pub fn feed(engine: &mut LayerCakeEngine, signal: &[f32]) {
    for chunk in signal.chunks(TEST_BUFFER_SIZE) {
        let mut l = vec![0.0; chunk.len()];
        let mut r = vec![0.0; chunk.len()];
        engine.process_block(&[chunk], &mut [l.as_mut_slice(), r.as_mut_slice()], chunk.len());
    }
}

/// Records `signal` into the current record layer.
pub fn record_signal(engine: &mut LayerCakeEngine, signal: &[f32]) {
    let handle = engine.handle();
    handle.set_record_enable(true);
    feed(engine, signal);
    handle.set_record_enable(false);
}

/// Peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |a, s| a.max(s.abs()))
}

/// Assert that a signal is approximately silent.
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content.
pub fn assert_has_audio(samples: &[f32], min_peak: f32) {
    let max = peak(samples);
    assert!(
        max >= min_peak,
        "Expected audio with peak >= {}, but peak was {}",
        min_peak,
        max
    );
}
