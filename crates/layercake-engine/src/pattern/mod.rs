//! Step sequencer that records and replays grain requests.
//!
//! A [`PatternClock`] ticks on its own [`Metro`]. Each tick it either
//! samples a live grain from its builder (Idle), samples and stores one
//! (Recording), or replays a stored step (Playback). Recording a full
//! pattern switches to Playback on its own.

mod controls;

pub use controls::ClockControls;

use std::sync::Arc;

use layercake_core::{GrainState, Metro};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Longest pattern a clock can hold.
pub const MAX_PATTERN_LENGTH: usize = 128;
pub const DEFAULT_PATTERN_LENGTH: usize = 16;

/// Produces the grain the clock should play right now.
pub type GrainBuilder = Box<dyn FnMut() -> GrainState + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClockMode {
    /// Every tick plays a freshly built grain.
    #[default]
    Idle = 0,
    /// Every tick builds, stores and plays a grain.
    Recording = 1,
    /// Every tick replays the stored step.
    Playback = 2,
}

impl ClockMode {
    fn from_u8(val: u8) -> Self {
        match val {
            1 => ClockMode::Recording,
            2 => ClockMode::Playback,
            _ => ClockMode::Idle,
        }
    }
}

/// Everything needed to restore a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSnapshot {
    pub pattern_length: usize,
    pub skip_probability: f32,
    pub period_ms: f64,
    pub enabled: bool,
    pub steps: Vec<GrainState>,
}

impl Default for PatternSnapshot {
    fn default() -> Self {
        Self {
            pattern_length: DEFAULT_PATTERN_LENGTH,
            skip_probability: 0.0,
            period_ms: 500.0,
            enabled: false,
            steps: vec![GrainState::default(); MAX_PATTERN_LENGTH],
        }
    }
}

pub struct PatternClock {
    metro: Metro,
    mode: ClockMode,
    pattern_length: usize,
    skip_probability: f32,
    current_step: usize,
    recorded_steps: usize,
    steps: Box<[GrainState; MAX_PATTERN_LENGTH]>,
    builder: Option<GrainBuilder>,
    controls: Arc<ClockControls>,
    rng: SmallRng,
}

impl PatternClock {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// Clock whose skip decisions are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self {
            metro: Metro::new(),
            mode: ClockMode::Idle,
            pattern_length: DEFAULT_PATTERN_LENGTH,
            skip_probability: 0.0,
            current_step: 0,
            recorded_steps: 0,
            steps: Box::new([GrainState::default(); MAX_PATTERN_LENGTH]),
            builder: None,
            controls: Arc::new(ClockControls::new()),
            rng,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.metro.prepare(sample_rate);
        self.current_step = 0;
        self.recorded_steps = 0;
        self.publish();
    }

    pub fn controls(&self) -> Arc<ClockControls> {
        Arc::clone(&self.controls)
    }

    pub fn set_grain_builder(&mut self, builder: GrainBuilder) {
        self.builder = Some(builder);
    }

    pub fn clear_grain_builder(&mut self) {
        self.builder = None;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.controls.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.controls.is_enabled()
    }

    pub fn set_auto_fire_enabled(&mut self, enabled: bool) {
        self.controls.set_auto_fire_enabled(enabled);
    }

    pub fn set_auto_fire_state(&mut self, state: GrainState) {
        self.controls.set_auto_fire_state(state);
    }

    /// Switches mode. Counters restart; entering Recording also clears the
    /// stored pattern and restarts the metronome period.
    pub fn set_mode(&mut self, mode: ClockMode) {
        self.mode = mode;
        self.current_step = 0;
        self.recorded_steps = 0;
        if mode == ClockMode::Recording {
            self.steps.fill(GrainState::default());
            self.metro.reset();
        }
        self.publish();
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Clamped to `1..=MAX_PATTERN_LENGTH`.
    pub fn set_pattern_length(&mut self, length: usize) {
        self.pattern_length = length.clamp(1, MAX_PATTERN_LENGTH);
        if self.current_step >= self.pattern_length {
            self.current_step = 0;
        }
        self.publish();
    }

    pub fn pattern_length(&self) -> usize {
        self.pattern_length
    }

    pub fn set_skip_probability(&mut self, probability: f32) {
        self.skip_probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn skip_probability(&self) -> f32 {
        self.skip_probability
    }

    pub fn set_period_ms(&mut self, period_ms: f64) {
        self.metro.set_period_ms(period_ms);
    }

    pub fn period_ms(&self) -> f64 {
        self.metro.period_ms()
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm > 0.0 {
            self.set_period_ms(Metro::bpm_to_period_ms(bpm));
        }
    }

    pub fn bpm(&self) -> f64 {
        Metro::period_ms_to_bpm(self.period_ms())
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn recorded_steps(&self) -> usize {
        self.recorded_steps
    }

    pub fn step(&self, index: usize) -> Option<&GrainState> {
        self.steps.get(index)
    }

    pub fn snapshot(&self) -> PatternSnapshot {
        PatternSnapshot {
            pattern_length: self.pattern_length,
            skip_probability: self.skip_probability,
            period_ms: self.period_ms(),
            enabled: self.is_enabled(),
            steps: self.steps.to_vec(),
        }
    }

    /// Restores a pattern. An enabled snapshot resumes in Playback,
    /// otherwise the clock goes Idle.
    pub fn apply_snapshot(&mut self, snapshot: &PatternSnapshot) {
        self.pattern_length = snapshot.pattern_length.clamp(1, MAX_PATTERN_LENGTH);
        self.set_skip_probability(snapshot.skip_probability);
        self.metro.set_period_ms(snapshot.period_ms);
        self.steps.fill(GrainState::default());
        for (slot, step) in self.steps.iter_mut().zip(&snapshot.steps) {
            *slot = *step;
        }
        self.controls.set_enabled(snapshot.enabled);
        self.mode = if snapshot.enabled {
            ClockMode::Playback
        } else {
            ClockMode::Idle
        };
        self.current_step = 0;
        self.recorded_steps = 0;
        self.metro.reset();
        self.publish();
    }

    /// Applies changes queued through [`ClockControls`]. Called by the
    /// engine at each block boundary.
    pub fn apply_pending_requests(&mut self) {
        let controls = Arc::clone(&self.controls);
        controls.take_pending(|changes| {
            if let Some(snapshot) = changes.snapshot {
                self.apply_snapshot(snapshot);
            }
            if let Some(length) = changes.pattern_length {
                self.set_pattern_length(length);
            }
            if let Some(probability) = changes.skip_probability {
                self.set_skip_probability(probability);
            }
            if let Some(period_ms) = changes.period_ms {
                self.set_period_ms(period_ms);
            }
            if let Some(mode) = changes.mode {
                self.set_mode(mode);
            }
        });
    }

    /// Advances one sample, handing any grain due on this tick to `fire`.
    /// The metronome keeps its phase while disabled; only steps are gated.
    #[inline]
    pub fn process_sample(&mut self, fire: &mut dyn FnMut(GrainState)) {
        self.metro.process_sample();
        if self.metro.consume_tick() && self.controls.is_enabled() {
            self.advance_step(fire);
        }
    }

    fn advance_step(&mut self, fire: &mut dyn FnMut(GrainState)) {
        let step = self.current_step;
        match self.mode {
            ClockMode::Recording => {
                let state = match self.builder.as_mut() {
                    Some(build) => GrainState {
                        should_trigger: true,
                        ..build()
                    },
                    None => GrainState::default(),
                };
                self.steps[step] = state;
                self.recorded_steps += 1;
                self.trigger_step_state(state, fire);
                if self.recorded_steps >= self.pattern_length {
                    self.mode = ClockMode::Playback;
                    self.recorded_steps = 0;
                }
            }
            ClockMode::Playback => {
                let state = self.steps[step];
                if !self.should_skip_step() {
                    self.trigger_step_state(state, fire);
                }
            }
            ClockMode::Idle => {
                if let Some(build) = self.builder.as_mut() {
                    let state = build();
                    self.controls.try_store_auto_fire_state(state);
                    self.trigger_step_state(state, fire);
                }
            }
        }
        self.current_step = (step + 1) % self.pattern_length;
        self.publish();
    }

    fn should_skip_step(&mut self) -> bool {
        self.skip_probability > 0.0 && self.rng.gen::<f32>() < self.skip_probability
    }

    /// Fires `state` if the clock is enabled. An unarmed state falls back to
    /// the auto-fire state, armed on substitution, when auto-fire is enabled.
    pub fn trigger_step_state(&mut self, state: GrainState, fire: &mut dyn FnMut(GrainState)) {
        if !self.controls.is_enabled() {
            return;
        }
        let state = if state.is_valid() {
            state
        } else if self.controls.is_auto_fire_enabled() {
            match self.controls.try_auto_fire_state() {
                Some(fallback) => GrainState {
                    should_trigger: true,
                    ..fallback
                },
                None => return,
            }
        } else {
            return;
        };
        fire(state);
    }

    fn publish(&self) {
        self.controls.publish(self.mode, self.current_step);
    }
}

impl Default for PatternClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatternClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternClock")
            .field("mode", &self.mode)
            .field("pattern_length", &self.pattern_length)
            .field("current_step", &self.current_step)
            .field("recorded_steps", &self.recorded_steps)
            .field("period_ms", &self.period_ms())
            .finish()
    }
}
