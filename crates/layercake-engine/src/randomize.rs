//! Start-position and direction randomization for grain requests.

use layercake_core::GrainState;
use rand::Rng;

/// Moves `state.loop_start_seconds` by a random offset.
///
/// The offset is at most `spread * recorded_seconds / 2`, and the result
/// stays where a grain of `state.duration_ms` still fits inside the
/// recording. A spread of zero leaves the state unchanged.
pub fn apply_spread_randomization<R: Rng + ?Sized>(
    state: &mut GrainState,
    spread: f32,
    recorded_samples: usize,
    sample_rate: f64,
    rng: &mut R,
) {
    let spread = spread.clamp(0.0, 1.0);
    if spread <= 0.0 || sample_rate <= 0.0 {
        return;
    }
    let recorded_seconds = recorded_samples as f64 / sample_rate;
    let duration_seconds = (state.duration_ms as f64 * 0.001).max(0.0);
    let max_start = (recorded_seconds - duration_seconds).max(0.0);
    if max_start <= 0.0 {
        state.loop_start_seconds = 0.0;
        return;
    }
    let max_offset = max_start.min(recorded_seconds * spread as f64 * 0.5);
    let base = (state.loop_start_seconds as f64).clamp(0.0, max_start);
    let offset = (rng.gen::<f64>() * 2.0 - 1.0) * max_offset;
    state.loop_start_seconds = (base + offset).clamp(0.0, max_start) as f32;
}

/// Plays `state` reversed with probability `reverse_probability`.
pub fn apply_direction_randomization<R: Rng + ?Sized>(
    state: &mut GrainState,
    reverse_probability: f32,
    rng: &mut R,
) {
    let probability = reverse_probability.clamp(0.0, 1.0);
    state.play_forward = if probability <= 0.0 {
        true
    } else {
        rng.gen::<f32>() >= probability
    };
}
