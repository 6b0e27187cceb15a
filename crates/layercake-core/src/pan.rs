//! Pan laws and the optional multichannel panner stage.

use std::f32::consts::FRAC_PI_2;

/// Maps a pan position in `[0, 1]` to `(left, right)` gains.
pub type PanLaw = fn(f32) -> (f32, f32);

/// Constant-power pan: `cos`/`sin` over a quarter turn.
///
/// Centre gives `(√½, √½)`.
#[inline]
pub fn equal_power_gains(pan: f32) -> (f32, f32) {
    let angle = pan.clamp(0.0, 1.0) * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// Linear crossfade pan. Centre gives `(0.5, 0.5)`.
#[inline]
pub fn linear_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(0.0, 1.0);
    (1.0 - pan, pan)
}

/// Distributes the engine's stereo mix across the output channels.
///
/// Implementations run on the audio thread and must not allocate.
pub trait Panner: Send {
    /// `inputs` holds the left and right mix for `num_samples` samples.
    /// The panner adds its contribution into `outputs`.
    fn process_block(&mut self, inputs: [&[f32]; 2], outputs: &mut [&mut [f32]], num_samples: usize);
}
