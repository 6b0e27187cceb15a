//! Control-thread API for a running engine.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use layercake_automation::{LfoSlotConfig, NUM_LFO_SLOTS};
use layercake_core::{GrainState, GrainVisualState, LayerBufferSnapshot, SyncStrategy, TapeBuffer};
use tracing::{debug, warn};

use crate::loader::{normalize_peak, resample_linear, AudioFileReader};
use crate::pattern::ClockControls;
use crate::randomize;
use crate::shared::{EngineShared, NUM_LAYERS};
use crate::{Error, Result};

/// Thread-safe handle to a [`LayerCakeEngine`](crate::LayerCakeEngine).
///
/// Cheap to clone; every method may be called from any non-audio thread.
/// Nothing here blocks the audio thread: grain requests travel through a
/// bounded queue, settings through atomics, and structural changes to a
/// layer through that layer's own lock.
#[derive(Clone)]
pub struct EngineHandle {
    pub(crate) shared: Arc<EngineShared>,
}

impl EngineHandle {
    // --- Triggering ---

    /// Queues a grain for the next audio block.
    ///
    /// Returns `false` when the request is malformed (layer out of range,
    /// non-positive duration) or the queue is full; the grain is dropped.
    pub fn trigger_grain(&self, state: GrainState) -> bool {
        if !state.is_well_formed(NUM_LAYERS) {
            warn!(layer = state.layer, duration_ms = state.duration_ms, "Rejected malformed grain");
            return false;
        }
        let state = GrainState {
            should_trigger: true,
            ..state
        };
        if self.shared.triggers.lock().push(state) {
            true
        } else {
            warn!("Trigger queue full, dropping grain");
            false
        }
    }

    /// Asks the audio thread to fire the manual template once.
    pub fn request_manual_trigger(&self) {
        self.shared.manual_requests.fetch_add(1, Ordering::AcqRel);
    }

    pub fn set_manual_grain_template(&self, state: GrainState) {
        *self.shared.manual_template.lock() = state;
    }

    pub fn manual_grain_template(&self) -> GrainState {
        *self.shared.manual_template.lock()
    }

    pub fn set_manual_reverse_probability(&self, probability: f32) {
        self.shared
            .manual_reverse_probability
            .store(probability.clamp(0.0, 1.0), Ordering::Release);
    }

    /// Randomizes `state`'s start within its layer's recording.
    pub fn apply_spread_randomization(&self, state: &mut GrainState, spread: f32) {
        let recorded = self
            .shared
            .layer(state.layer)
            .map_or(0, |layer| layer.recorded_length());
        randomize::apply_spread_randomization(
            state,
            spread,
            recorded,
            self.shared.sample_rate.load(Ordering::Acquire),
            &mut rand::thread_rng(),
        );
    }

    pub fn apply_direction_randomization(&self, state: &mut GrainState, reverse_probability: f32) {
        randomize::apply_direction_randomization(
            state,
            reverse_probability,
            &mut rand::thread_rng(),
        );
    }

    // --- Recording ---

    /// Starts or stops recording into the current record layer.
    ///
    /// Starting clears the layer unless it already holds a recording (which
    /// is then overdubbed) and rewinds to sample 0. Stopping fixes the loop
    /// length at the number of samples recorded. Repeating the current
    /// state does nothing.
    pub fn set_record_enable(&self, enabled: bool) {
        let target = self.shared.record_lock.lock();
        if self.shared.record_enabled.load(Ordering::Acquire) == enabled {
            return;
        }
        let layer = &self.shared.layers[target.layer];
        let cursor = &self.shared.write_cursor;
        if enabled {
            if !layer.has_recorded() {
                layer.clear();
            }
            self.shared.record_cursor.store(0, Ordering::Release);
            cursor.reset_position();
            cursor.set_record_enabled(true);
            self.shared.record_enabled.store(true, Ordering::Release);
            debug!(layer = target.layer, "Recording started");
        } else {
            self.shared.record_enabled.store(false, Ordering::Release);
            let recorded = self.shared.record_cursor.load(Ordering::Acquire);
            let length = cursor.finalize_recording(recorded.min(layer.capacity()));
            if cursor.capacity_reached() {
                warn!(layer = target.layer, "Recording reached layer capacity");
            }
            debug!(layer = target.layer, length, "Recording stopped");
        }
    }

    pub fn is_record_enabled(&self) -> bool {
        self.shared.record_enabled.load(Ordering::Acquire)
    }

    /// Points the write cursor at another layer, restarting its position.
    pub fn set_record_layer(&self, layer: usize) -> Result<()> {
        if layer >= NUM_LAYERS {
            warn!(layer, "Invalid record layer");
            return Err(layercake_core::Error::InvalidLayer(layer).into());
        }
        let mut target = self.shared.record_lock.lock();
        if target.layer == layer {
            return Ok(());
        }
        target.layer = layer;
        let cursor = &self.shared.write_cursor;
        cursor.rebind(Arc::clone(&self.shared.layers[layer]));
        cursor.set_record_enabled(self.shared.record_enabled.load(Ordering::Acquire));
        self.shared.record_cursor.store(0, Ordering::Release);
        debug!(layer, "Record layer changed");
        Ok(())
    }

    pub fn record_layer(&self) -> usize {
        self.shared.record_lock.lock().layer
    }

    /// `None` records channel 0. A channel the host doesn't supply also
    /// falls back to channel 0.
    pub fn set_record_input_channel(&self, channel: Option<usize>) {
        self.shared.write_cursor.set_input_channel(channel);
    }

    pub fn record_input_channel(&self) -> Option<usize> {
        self.shared.write_cursor.input_channel()
    }

    /// 0.0 replaces existing audio, 1.0 adds to it.
    pub fn set_overdub_mix(&self, mix: f32) {
        self.shared.write_cursor.set_overdub_mix(mix);
    }

    // --- Output ---

    pub fn set_master_gain_db(&self, db: f32) {
        if db.is_finite() {
            self.shared.master_gain_db.store(db, Ordering::Release);
        }
    }

    pub fn master_gain_db(&self) -> f32 {
        self.shared.master_gain_db.load(Ordering::Acquire)
    }

    // --- Layers ---

    pub fn layer(&self, layer: usize) -> Option<Arc<TapeBuffer>> {
        self.shared.layer(layer).cloned()
    }

    pub fn num_layers(&self) -> usize {
        NUM_LAYERS
    }

    pub fn set_normalize_on_load(&self, normalize: bool) {
        self.shared.normalize_on_load.store(normalize, Ordering::Release);
    }

    pub fn normalize_on_load(&self) -> bool {
        self.shared.normalize_on_load.load(Ordering::Acquire)
    }

    pub fn capture_layer_snapshot(&self, layer: usize) -> Result<LayerBufferSnapshot> {
        let tape = self.checked_layer(layer)?;
        let _target = self.shared.record_lock.lock();
        Ok(tape.snapshot())
    }

    pub fn capture_all_layer_snapshots(&self) -> Vec<LayerBufferSnapshot> {
        let _target = self.shared.record_lock.lock();
        self.shared.layers.iter().map(|tape| tape.snapshot()).collect()
    }

    /// Replaces a layer's audio with `snapshot`.
    pub fn apply_layer_snapshot(&self, layer: usize, snapshot: &LayerBufferSnapshot) -> Result<()> {
        let tape = self.checked_layer(layer)?;
        let _target = self.shared.record_lock.lock();
        tape.restore(snapshot);
        debug!(layer, samples = tape.recorded_length(), "Applied layer snapshot");
        Ok(())
    }

    /// Loads mono audio at the engine's sample rate into `layer`.
    ///
    /// Longer material is truncated to the layer's capacity. Returns the
    /// number of samples kept.
    pub fn load_layer_from_samples(&self, layer: usize, samples: &[f32]) -> Result<usize> {
        let tape = self.checked_layer(layer)?;
        if !self.shared.prepared.load(Ordering::Acquire) {
            return Err(layercake_core::Error::NotPrepared.into());
        }
        if samples.is_empty() {
            return Err(layercake_core::Error::EmptyAudio.into());
        }
        let _target = self.shared.record_lock.lock();
        let kept = if self.shared.normalize_on_load.load(Ordering::Acquire) {
            let mut normalized = samples.to_vec();
            normalize_peak(&mut normalized);
            tape.load(&normalized)
        } else {
            tape.load(samples)
        };
        if kept < samples.len() {
            debug!(layer, kept, dropped = samples.len() - kept, "Truncated to layer capacity");
        }
        Ok(kept)
    }

    /// Decodes `path` with `reader` and loads it into `layer`, resampling
    /// to the engine rate. The layer is untouched if anything fails.
    pub fn load_layer_with(
        &self,
        reader: &dyn AudioFileReader,
        layer: usize,
        path: &Path,
    ) -> Result<usize> {
        self.checked_layer(layer)?;
        if !self.shared.prepared.load(Ordering::Acquire) {
            return Err(layercake_core::Error::NotPrepared.into());
        }
        let decoded = reader.read_mono(path)?;
        if decoded.samples.is_empty() {
            return Err(layercake_core::Error::EmptyAudio.into());
        }
        let engine_rate = self.shared.sample_rate.load(Ordering::Acquire).round() as u32;
        let samples = resample_linear(&decoded.samples, decoded.sample_rate, engine_rate);
        let kept = self.load_layer_from_samples(layer, &samples)?;
        debug!(layer, path = %path.display(), kept, "Loaded layer from file");
        Ok(kept)
    }

    #[cfg(feature = "wav")]
    pub fn load_layer_from_file(&self, layer: usize, path: impl AsRef<Path>) -> Result<usize> {
        self.load_layer_with(&crate::loader::WavFileReader, layer, path.as_ref())
    }

    fn checked_layer(&self, layer: usize) -> Result<&Arc<TapeBuffer>> {
        self.shared
            .layer(layer)
            .ok_or(Error::Core(layercake_core::Error::InvalidLayer(layer)))
    }

    // --- LFOs ---

    pub fn update_lfo_slot(&self, slot: usize, config: LfoSlotConfig) -> Result<()> {
        Ok(self.shared.lfo.update_slot(slot, config)?)
    }

    pub fn set_lfo_enabled(&self, slot: usize, enabled: bool) -> Result<()> {
        Ok(self.shared.lfo.set_slot_enabled(slot, enabled)?)
    }

    /// The slot whose rising zero crossings fire the manual template.
    pub fn set_trigger_lfo(&self, slot: Option<usize>) -> Result<()> {
        if let Some(slot) = slot.filter(|&slot| slot >= NUM_LFO_SLOTS) {
            return Err(layercake_core::Error::InvalidLfoSlot(slot).into());
        }
        self.shared.set_trigger_lfo(slot);
        Ok(())
    }

    pub fn trigger_lfo(&self) -> Option<usize> {
        self.shared.trigger_lfo()
    }

    pub fn lfo_visual_value(&self, slot: usize) -> f32 {
        self.shared.lfo.visual_value(slot)
    }

    // --- Display ---

    /// Every voice that was playing at the end of the last block.
    pub fn active_grains(&self) -> Vec<GrainVisualState> {
        self.shared
            .monitors
            .iter()
            .map(|monitor| monitor.visual_state())
            .filter(|visual| visual.is_active)
            .collect()
    }

    // --- Transport ---

    pub fn set_bpm(&self, bpm: f64) {
        self.shared.sync.load().set_tempo(bpm);
    }

    pub fn bpm(&self) -> f64 {
        self.shared.sync.load().tempo()
    }

    pub fn master_beats(&self) -> f64 {
        self.shared.sync.load().current_beat()
    }

    pub fn set_transport_playing(&self, playing: bool) {
        self.shared.sync.load().set_playing(playing);
    }

    pub fn is_transport_playing(&self) -> bool {
        self.shared.sync.load().is_playing()
    }

    pub fn reset_transport(&self) {
        self.shared.sync.load().request_reset();
    }

    /// Swaps the tempo source. Prepared engines prepare it first.
    pub fn set_sync_strategy(&self, strategy: Box<dyn SyncStrategy>) {
        if self.shared.prepared.load(Ordering::Acquire) {
            strategy.prepare(
                self.shared.sample_rate.load(Ordering::Acquire),
                self.shared.block_size.load(Ordering::Acquire),
            );
        }
        let old = self.shared.sync.swap(Arc::new(strategy));
        self.shared.retired_sync.retire(old);
        debug!("Sync strategy replaced");
    }

    // --- Pattern clock ---

    pub fn pattern_clock(&self) -> &ClockControls {
        &self.shared.clock
    }

    pub fn is_prepared(&self) -> bool {
        self.shared.prepared.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> f64 {
        self.shared.sample_rate.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("prepared", &self.is_prepared())
            .field("record_enabled", &self.is_record_enabled())
            .finish()
    }
}
