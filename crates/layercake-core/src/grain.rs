//! Grain request, display and snapshot value types.

use serde::{Deserialize, Serialize};

/// A request to play one grain, or one stored pattern step.
///
/// Only `should_trigger` decides whether a step fires; everything else
/// describes the grain. A default state is the "null" step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrainState {
    pub layer: usize,
    pub loop_start_seconds: f32,
    pub duration_ms: f32,
    pub rate_semitones: f32,
    pub env_attack_ms: f32,
    pub env_release_ms: f32,
    pub play_forward: bool,
    /// 0.0 is hard left, 1.0 hard right.
    pub pan: f32,
    /// Fraction of the recording the start position may wander over.
    pub spread_amount: f32,
    pub reverse_probability: f32,
    pub should_trigger: bool,
}

impl Default for GrainState {
    fn default() -> Self {
        Self {
            layer: 0,
            loop_start_seconds: 0.0,
            duration_ms: 120.0,
            rate_semitones: 0.0,
            env_attack_ms: 5.0,
            env_release_ms: 120.0,
            play_forward: true,
            pan: 0.5,
            spread_amount: 0.0,
            reverse_probability: 0.0,
            should_trigger: false,
        }
    }
}

impl GrainState {
    /// A default grain on `layer` that will fire.
    pub fn on_layer(layer: usize) -> Self {
        Self {
            layer,
            should_trigger: true,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.should_trigger
    }

    /// Rejects requests no voice could honour: out-of-range layer,
    /// non-positive duration or non-finite parameters.
    pub fn is_well_formed(&self, num_layers: usize) -> bool {
        self.layer < num_layers
            && self.duration_ms.is_finite()
            && self.duration_ms > 0.0
            && self.loop_start_seconds.is_finite()
            && self.rate_semitones.is_finite()
            && self.env_attack_ms.is_finite()
            && self.env_release_ms.is_finite()
            && self.pan.is_finite()
    }
}

/// What a voice is doing, for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrainVisualState {
    pub is_active: bool,
    pub layer: usize,
    pub voice_index: usize,
    pub loop_start_samples: f32,
    pub loop_end_samples: f32,
    pub recorded_length_samples: f32,
    pub rate_semitones: f32,
    pub play_forward: bool,
    pub pan: f32,
    pub envelope_value: f32,
    /// Playback position within the recording, 0..1.
    pub normalized_position: f32,
}

/// Copy of a layer's recorded audio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerBufferSnapshot {
    pub samples: Vec<f32>,
    pub recorded_length: usize,
    pub has_audio: bool,
}
