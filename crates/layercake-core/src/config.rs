//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Longest recording a single layer can hold.
pub const MAX_LAYER_DURATION_SECS: f64 = 10.0;

/// Capacity of the control-to-audio grain trigger queue.
pub const TRIGGER_QUEUE_CAPACITY: usize = 512;

/// Configuration for the granular engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-layer buffer length, in seconds, allocated at prepare time.
    pub max_layer_duration_secs: f64,
    /// Pending grain triggers held between audio blocks.
    pub trigger_queue_capacity: usize,
    pub master_gain_db: f32,
    /// Input channel recorded into the active layer. `None` follows channel 0.
    pub record_input_channel: Option<usize>,
    /// 0.0 replaces existing audio while recording, 1.0 sums with it.
    pub overdub_mix: f32,
    /// Peak-normalize audio loaded from files.
    pub normalize_on_load: bool,
    pub initial_tempo_bpm: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_layer_duration_secs: MAX_LAYER_DURATION_SECS,
            trigger_queue_capacity: TRIGGER_QUEUE_CAPACITY,
            master_gain_db: 0.0,
            record_input_channel: None,
            overdub_mix: 0.0,
            normalize_on_load: false,
            initial_tempo_bpm: 120.0,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_layer_duration_secs > 0.0 && self.max_layer_duration_secs <= 600.0) {
            return Err(Error::InvalidConfig(format!(
                "max_layer_duration_secs {} out of range (0-600 s)",
                self.max_layer_duration_secs
            )));
        }
        if self.trigger_queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "trigger_queue_capacity must be non-zero".into(),
            ));
        }
        if !self.master_gain_db.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "master_gain_db {} is not finite",
                self.master_gain_db
            )));
        }
        if !(0.0..=1.0).contains(&self.overdub_mix) {
            return Err(Error::InvalidConfig(format!(
                "overdub_mix {} out of range (0-1)",
                self.overdub_mix
            )));
        }
        if !(crate::sync::MIN_TEMPO_BPM..=crate::sync::MAX_TEMPO_BPM)
            .contains(&self.initial_tempo_bpm)
        {
            return Err(Error::InvalidTempo(self.initial_tempo_bpm));
        }
        Ok(())
    }
}

/// Converts decibels to linear gain.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}
