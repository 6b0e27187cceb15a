//! The audio-thread engine.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use layercake_automation::LfoBank;
use layercake_core::{db_to_gain, EngineConfig, GrainState, PanLaw, Panner, SyncStrategy, TapeBuffer};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::builder::EngineBuilder;
use crate::handle::EngineHandle;
use crate::pattern::PatternClock;
use crate::pool::{VoicePool, NUM_VOICES};
use crate::queue::{trigger_queue, TriggerConsumer};
use crate::randomize::{apply_direction_randomization, apply_spread_randomization};
use crate::shared::EngineShared;
use crate::Result;

/// Granular looping engine: six recordable layers, sixteen grain voices,
/// eight LFOs and a pattern clock.
///
/// Owned by the audio thread. Everything else talks to it through an
/// [`EngineHandle`].
pub struct LayerCakeEngine {
    shared: Arc<EngineShared>,
    voices: VoicePool,
    triggers: TriggerConsumer,
    lfo: LfoBank,
    clock: PatternClock,
    rng: SmallRng,
    panner: Option<Box<dyn Panner>>,
    mix_left: Vec<f32>,
    mix_right: Vec<f32>,
    sample_rate: f64,
    num_output_channels: usize,
    warned_unprepared: bool,
    warned_no_input: bool,
    warned_oversized: bool,
    warned_layout: bool,
}

impl LayerCakeEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        sync: Box<dyn SyncStrategy>,
        seed: Option<u64>,
    ) -> Result<Self> {
        config.validate()?;
        sync.set_tempo(config.initial_tempo_bpm);

        let (producer, consumer) = trigger_queue(config.trigger_queue_capacity);
        let (rng, clock) = match seed {
            Some(seed) => (
                SmallRng::seed_from_u64(seed),
                PatternClock::with_seed(seed.wrapping_add(1)),
            ),
            None => (SmallRng::from_entropy(), PatternClock::new()),
        };
        let voices = VoicePool::new(NUM_VOICES);
        let shared = EngineShared::new(config, producer, sync, clock.controls(), voices.monitors());

        Ok(Self {
            shared: Arc::new(shared),
            voices,
            triggers: consumer,
            lfo: LfoBank::new(),
            clock,
            rng,
            panner: None,
            mix_left: Vec::new(),
            mix_right: Vec::new(),
            sample_rate: 0.0,
            num_output_channels: 0,
            warned_unprepared: false,
            warned_no_input: false,
            warned_oversized: false,
            warned_layout: false,
        })
    }

    /// A handle for control threads.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Allocates every layer for the configured duration at `sample_rate`
    /// and resets voices, LFOs, the clock and the write cursor.
    /// `num_output_channels` fixes how many output slices each block renders.
    ///
    /// Not real-time safe; call before processing starts.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize, num_output_channels: usize) {
        let shared = &self.shared;
        self.sample_rate = sample_rate;
        self.num_output_channels = num_output_channels;
        shared.sample_rate.store(sample_rate, Ordering::Release);
        shared.block_size.store(block_size, Ordering::Release);
        shared.sync.load().prepare(sample_rate, block_size);

        {
            let target = shared.record_lock.lock();
            for layer in &shared.layers {
                layer.allocate(sample_rate, shared.config.max_layer_duration_secs);
            }
            shared
                .write_cursor
                .rebind(Arc::clone(&shared.layers[target.layer]));
            shared.write_cursor.set_record_enabled(false);
            shared.record_enabled.store(false, Ordering::Release);
            shared.record_cursor.store(0, Ordering::Release);
        }

        self.voices.prepare(sample_rate);
        self.lfo.prepare(sample_rate);
        self.clock.prepare(sample_rate);
        self.mix_left = vec![0.0; block_size];
        self.mix_right = vec![0.0; block_size];
        self.warned_unprepared = false;
        self.warned_oversized = false;
        self.warned_layout = false;
        shared.prepared.store(true, Ordering::Release);
        debug!(sample_rate, block_size, num_output_channels, "Engine prepared");
    }

    pub fn is_prepared(&self) -> bool {
        self.shared.prepared.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn num_output_channels(&self) -> usize {
        self.num_output_channels
    }

    pub fn pattern_clock(&self) -> &PatternClock {
        &self.clock
    }

    pub fn pattern_clock_mut(&mut self) -> &mut PatternClock {
        &mut self.clock
    }

    /// Routes the stereo mix through `panner` instead of the default
    /// left/right/centre fan-out.
    pub fn set_panner(&mut self, panner: Option<Box<dyn Panner>>) {
        self.panner = panner;
    }

    pub fn set_pan_law(&mut self, pan_law: PanLaw) {
        self.voices.set_pan_law(pan_law);
    }

    pub fn voices(&self) -> &VoicePool {
        &self.voices
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    /// Renders one block.
    ///
    /// Order: swap LFO configs and clock requests, advance the tempo source,
    /// fire manual triggers, drain queued grains, then per sample run the
    /// LFOs and clock, record input, and mix voices into `outputs`.
    /// Channel 0 takes the left mix, channel 1 the right, and any further
    /// prepared channels their average. Slices past the prepared channel
    /// count are zeroed.
    pub fn process_block(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], num_samples: usize) {
        if !self.shared.prepared.load(Ordering::Acquire) {
            if !self.warned_unprepared {
                warn!("process_block called before prepare");
                self.warned_unprepared = true;
            }
            return;
        }
        if outputs.len() != self.num_output_channels && !self.warned_layout {
            warn!(
                prepared = self.num_output_channels,
                given = outputs.len(),
                "Output channel count differs from prepared layout"
            );
            self.warned_layout = true;
        }
        let layout = outputs.len().min(self.num_output_channels);
        let (outputs, unused) = outputs.split_at_mut(layout);
        for channel in unused.iter_mut() {
            let n = channel.len().min(num_samples);
            channel[..n].fill(0.0);
        }
        let num_samples = outputs
            .iter()
            .map(|channel| channel.len())
            .min()
            .unwrap_or(0)
            .min(num_samples);
        if num_samples == 0 {
            return;
        }

        self.lfo.sync_from(&self.shared.lfo);
        self.clock.apply_pending_requests();

        let (block_beat, beats_per_sample) = {
            let sync = self.shared.sync.load();
            sync.process(num_samples, self.sample_rate);
            let beats_per_sample = if sync.is_playing() {
                sync.tempo() / 60.0 / self.sample_rate
            } else {
                0.0
            };
            (sync.current_beat(), beats_per_sample)
        };

        let manual = self.shared.manual_requests.swap(0, Ordering::AcqRel);
        for _ in 0..manual {
            self.fire_manual_trigger();
        }
        while let Some(state) = self.triggers.pop() {
            self.start_grain_immediate(&state);
        }

        for channel in outputs.iter_mut() {
            channel[..num_samples].fill(0.0);
        }

        let input = self.record_input(inputs);
        let record_base = self.shared.record_cursor.load(Ordering::Acquire);
        let trigger_slot = self.shared.trigger_lfo();
        let gain = db_to_gain(self.shared.master_gain_db.load(Ordering::Acquire));
        let use_panner = self.panner.is_some() && num_samples <= self.mix_left.len();
        if self.panner.is_some() && !use_panner && !self.warned_oversized {
            warn!(num_samples, "Block larger than prepared size, bypassing panner");
            self.warned_oversized = true;
        }

        for i in 0..num_samples {
            let beat = block_beat + i as f64 * beats_per_sample;
            if self.lfo.process_sample(beat, trigger_slot) {
                self.fire_manual_trigger();
            }

            let sample_rate = self.sample_rate;
            self.clock.process_sample(&mut |state| {
                start_randomized(
                    &mut self.voices,
                    &mut self.rng,
                    &self.shared.layers,
                    sample_rate,
                    state,
                );
            });

            if let Some(input) = input {
                let sample = input.get(i).copied().unwrap_or(0.0);
                self.shared
                    .write_cursor
                    .process_sample(sample, record_base + i);
            }

            let (left, right) = self.voices.next_frame();
            let (left, right) = (left * gain, right * gain);
            if use_panner {
                self.mix_left[i] = left;
                self.mix_right[i] = right;
            } else {
                fan_out(outputs, i, left, right);
            }
        }

        if let (true, Some(panner)) = (use_panner, self.panner.as_mut()) {
            panner.process_block(
                [&self.mix_left[..num_samples], &self.mix_right[..num_samples]],
                outputs,
                num_samples,
            );
        }

        if input.is_some() {
            // A concurrent record restart rewinds the cursor; keep that.
            let _ = self.shared.record_cursor.compare_exchange(
                record_base,
                record_base + num_samples,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }

        self.voices.publish();
        self.lfo.publish(&self.shared.lfo);
    }

    fn record_input<'a>(&mut self, inputs: &[&'a [f32]]) -> Option<&'a [f32]> {
        if !self.shared.record_enabled.load(Ordering::Acquire) {
            return None;
        }
        let channel = self
            .shared
            .write_cursor
            .input_channel()
            .filter(|&channel| channel < inputs.len())
            .unwrap_or(0);
        let input = inputs.get(channel).copied();
        if input.is_none() && !self.warned_no_input {
            warn!("Recording enabled but no input channels supplied");
            self.warned_no_input = true;
        }
        input
    }

    /// Starts `state` on a voice right away, stealing voice 0 when the pool
    /// is full. Returns `false` for unarmed requests, unknown layers, empty
    /// layers and collapsed regions.
    pub fn start_grain_immediate(&mut self, state: &GrainState) -> bool {
        self.voices.start_grain(state, &self.shared.layers)
    }

    /// Fires the manual template once, with spread and direction
    /// randomization applied.
    pub fn fire_manual_trigger(&mut self) -> bool {
        let mut state = *self.shared.manual_template.lock();
        if !state.is_valid() {
            return false;
        }
        let recorded = self
            .shared
            .layer(state.layer)
            .map_or(0, |layer| layer.recorded_length());
        let spread = state.spread_amount;
        apply_spread_randomization(&mut state, spread, recorded, self.sample_rate, &mut self.rng);
        let reverse_probability = self.shared.manual_reverse_probability.load(Ordering::Acquire);
        if reverse_probability > 0.0 {
            apply_direction_randomization(&mut state, reverse_probability, &mut self.rng);
        }
        self.start_grain_immediate(&state)
    }
}

/// Randomizes a clock-fired state with its own spread and reverse
/// probability, then starts it.
fn start_randomized(
    voices: &mut VoicePool,
    rng: &mut SmallRng,
    layers: &[Arc<TapeBuffer>],
    sample_rate: f64,
    mut state: GrainState,
) -> bool {
    let recorded = layers
        .get(state.layer)
        .map_or(0, |layer| layer.recorded_length());
    let (spread, reverse_probability) = (state.spread_amount, state.reverse_probability);
    apply_spread_randomization(&mut state, spread, recorded, sample_rate, rng);
    if reverse_probability > 0.0 {
        apply_direction_randomization(&mut state, reverse_probability, rng);
    }
    voices.start_grain(&state, layers)
}

#[inline]
fn fan_out(outputs: &mut [&mut [f32]], index: usize, left: f32, right: f32) {
    let centre = (left + right) * 0.5;
    for (channel, output) in outputs.iter_mut().enumerate() {
        output[index] += match channel {
            0 => left,
            1 => right,
            _ => centre,
        };
    }
}

impl std::fmt::Debug for LayerCakeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerCakeEngine")
            .field("sample_rate", &self.sample_rate)
            .field("active_voices", &self.voices.active_count())
            .field("clock", &self.clock)
            .finish()
    }
}
