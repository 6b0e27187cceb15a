//! Fixed-size grain voice pool.

use std::sync::Arc;

use layercake_core::{GrainState, GrainVisualState, PanLaw, TapeBuffer};

use crate::voice::{GrainRegion, GrainVoice, VoiceMonitor};

/// Number of simultaneous grains.
pub const NUM_VOICES: usize = 16;

/// Owns every voice. Voices are allocated once and never resized.
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<GrainVoice>,
    sample_rate: f64,
}

impl VoicePool {
    pub fn new(num_voices: usize) -> Self {
        Self {
            voices: (0..num_voices).map(GrainVoice::new).collect(),
            sample_rate: 44100.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        for voice in &mut self.voices {
            voice.prepare(sample_rate);
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voice(&self, index: usize) -> Option<&GrainVoice> {
        self.voices.get(index)
    }

    pub fn monitors(&self) -> Vec<Arc<VoiceMonitor>> {
        self.voices.iter().map(GrainVoice::monitor).collect()
    }

    pub fn set_pan_law(&mut self, pan_law: PanLaw) {
        for voice in &mut self.voices {
            voice.set_pan_law(pan_law);
        }
    }

    /// First idle voice in pool order.
    pub fn find_free_voice(&self) -> Option<usize> {
        self.voices.iter().position(|voice| !voice.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_active()).count()
    }

    /// Starts `state` on a free voice, stealing voice 0 when all are busy.
    ///
    /// Fails without touching any voice when the request is not armed, names
    /// a layer outside `layers`, or cannot produce a playable region.
    pub fn start_grain(&mut self, state: &GrainState, layers: &[Arc<TapeBuffer>]) -> bool {
        if !state.is_valid() || !state.is_well_formed(layers.len()) {
            return false;
        }
        let tape = &layers[state.layer];
        let Some(region) = GrainRegion::plan(state, tape, self.sample_rate) else {
            return false;
        };
        if self.voices.is_empty() {
            return false;
        }
        let index = match self.find_free_voice() {
            Some(index) => index,
            None => {
                self.voices[0].force_stop();
                0
            }
        };
        self.voices[index].start(state, tape, region);
        true
    }

    /// Sum of every active voice for one sample.
    #[inline]
    pub fn next_frame(&mut self) -> (f32, f32) {
        self.voices
            .iter_mut()
            .filter(|voice| voice.is_active())
            .fold((0.0, 0.0), |(l, r), voice| {
                let (vl, vr) = voice.get_next_sample();
                (l + vl, r + vr)
            })
    }

    pub fn stop_all(&mut self) {
        for voice in &mut self.voices {
            voice.force_stop();
        }
    }

    /// Refreshes every voice's display mirror.
    pub fn publish(&self) {
        for voice in &self.voices {
            voice.publish();
        }
    }

    pub fn active_visuals(&self) -> impl Iterator<Item = GrainVisualState> + '_ {
        self.voices
            .iter()
            .filter(|voice| voice.is_active())
            .map(GrainVoice::visual_state)
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        Self::new(NUM_VOICES)
    }
}
