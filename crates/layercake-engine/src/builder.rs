//! Builder for configuring and constructing a `LayerCakeEngine`.

use layercake_core::{EngineConfig, InternalSync, SyncStrategy};

use crate::{LayerCakeEngine, Result};

/// Tempo follows the built-in [`InternalSync`] unless a strategy is given.
///
/// # Example
///
/// ```ignore
/// use layercake_engine::LayerCakeEngine;
///
/// let mut engine = LayerCakeEngine::builder()
///     .max_layer_duration_secs(8.0)
///     .master_gain_db(-3.0)
///     .build()?;
/// engine.prepare(48000.0, 256, 2);
/// let handle = engine.handle();
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    sync: Option<Box<dyn SyncStrategy>>,
    seed: Option<u64>,
}

impl EngineBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_layer_duration_secs(mut self, seconds: f64) -> Self {
        self.config.max_layer_duration_secs = seconds;
        self
    }

    pub fn trigger_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.trigger_queue_capacity = capacity;
        self
    }

    pub fn master_gain_db(mut self, db: f32) -> Self {
        self.config.master_gain_db = db;
        self
    }

    pub fn record_input_channel(mut self, channel: Option<usize>) -> Self {
        self.config.record_input_channel = channel;
        self
    }

    pub fn overdub_mix(mut self, mix: f32) -> Self {
        self.config.overdub_mix = mix;
        self
    }

    pub fn normalize_on_load(mut self, normalize: bool) -> Self {
        self.config.normalize_on_load = normalize;
        self
    }

    pub fn tempo(mut self, bpm: f64) -> Self {
        self.config.initial_tempo_bpm = bpm;
        self
    }

    pub fn sync_strategy(mut self, strategy: Box<dyn SyncStrategy>) -> Self {
        self.sync = Some(strategy);
        self
    }

    /// Makes every random decision (spread, direction, pattern skips)
    /// reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<LayerCakeEngine> {
        let bpm = self.config.initial_tempo_bpm;
        let sync = self
            .sync
            .unwrap_or_else(|| Box::new(InternalSync::new(bpm)) as Box<dyn SyncStrategy>);
        LayerCakeEngine::from_parts(self.config, sync, self.seed)
    }
}
