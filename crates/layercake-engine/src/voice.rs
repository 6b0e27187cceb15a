//! A single grain voice.

use std::sync::Arc;

use layercake_core::{
    equal_power_gains, Envelope, GrainState, GrainVisualState, PanLaw, PlayDirection, ReadCursor,
    TapeBuffer,
};

/// Slowest playback ratio (four octaves down).
pub const MIN_PLAYBACK_RATIO: f64 = 0.0625;
/// Fastest playback ratio (two octaves up).
pub const MAX_PLAYBACK_RATIO: f64 = 4.0;

/// Semitone offset to a clamped playback ratio.
#[inline]
pub fn semitones_to_ratio(semitones: f32) -> f64 {
    2.0_f64
        .powf(semitones as f64 / 12.0)
        .clamp(MIN_PLAYBACK_RATIO, MAX_PLAYBACK_RATIO)
}

/// Where in a tape a grain plays, resolved from a [`GrainState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainRegion {
    pub loop_start: f64,
    pub loop_end: f64,
    pub start_position: f64,
    pub ratio: f64,
    pub recorded_length: usize,
}

impl GrainRegion {
    /// Resolves the loop region for `state` on `tape`.
    ///
    /// `None` when the tape holds no audio or the region collapses to a
    /// single sample or less.
    pub fn plan(state: &GrainState, tape: &TapeBuffer, sample_rate: f64) -> Option<Self> {
        if !tape.has_recorded() {
            return None;
        }
        let recorded_length = tape.recorded_length();
        if recorded_length == 0 {
            return None;
        }
        let len = recorded_length as f64;
        let loop_start = (state.loop_start_seconds as f64 * sample_rate).clamp(0.0, len - 1.0);
        let duration = (state.duration_ms as f64 * 0.001 * sample_rate).max(1.0);
        let loop_end = (loop_start + duration).min(len);
        if loop_end <= loop_start + 1.0 {
            return None;
        }
        let start_position = if state.play_forward {
            loop_start
        } else {
            loop_end - 1.0
        };
        Some(Self {
            loop_start,
            loop_end,
            start_position,
            ratio: semitones_to_ratio(state.rate_semitones),
            recorded_length,
        })
    }
}

/// Display state of one voice, written by the audio thread.
///
/// The lock doubles as the voice's guard while it is (re)triggered or
/// stopped; per-sample processing only refreshes it once per block with
/// `try_lock`.
#[derive(Debug, Default)]
pub struct VoiceMonitor {
    visual: spin::Mutex<GrainVisualState>,
}

impl VoiceMonitor {
    pub fn visual_state(&self) -> GrainVisualState {
        *self.visual.lock()
    }
}

/// Plays one grain at a time: a looping read cursor shaped by an envelope
/// and placed in the stereo field.
pub struct GrainVoice {
    index: usize,
    sample_rate: f64,
    envelope: Envelope,
    cursor: Option<ReadCursor>,
    state: GrainState,
    region: Option<GrainRegion>,
    gains: (f32, f32),
    pan_law: PanLaw,
    active: bool,
    last_envelope: f32,
    normalized_position: f32,
    monitor: Arc<VoiceMonitor>,
}

impl GrainVoice {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            sample_rate: 44100.0,
            envelope: Envelope::new(44100.0),
            cursor: None,
            state: GrainState::default(),
            region: None,
            gains: equal_power_gains(0.5),
            pan_law: equal_power_gains,
            active: false,
            last_envelope: 0.0,
            normalized_position: 0.0,
            monitor: Arc::new(VoiceMonitor::default()),
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.envelope.set_sample_rate(sample_rate);
        self.force_stop();
    }

    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> &GrainState {
        &self.state
    }

    pub fn monitor(&self) -> Arc<VoiceMonitor> {
        Arc::clone(&self.monitor)
    }

    pub fn set_pan_law(&mut self, pan_law: PanLaw) {
        self.pan_law = pan_law;
    }

    /// Starts playing `state` from `tape`. Returns `false`, leaving the
    /// voice untouched, when the tape is empty or the region collapses.
    pub fn trigger(&mut self, state: &GrainState, tape: &Arc<TapeBuffer>) -> bool {
        match GrainRegion::plan(state, tape, self.sample_rate) {
            Some(region) => {
                self.start(state, tape, region);
                true
            }
            None => false,
        }
    }

    /// Starts a grain whose region was already resolved.
    pub fn start(&mut self, state: &GrainState, tape: &Arc<TapeBuffer>, region: GrainRegion) {
        let mut visual = self.monitor.visual.lock();

        // Keep the cursor when it already reads this tape.
        let mut cursor = match self.cursor.take() {
            Some(cursor) if Arc::ptr_eq(cursor.tape(), tape) => cursor,
            _ => ReadCursor::new(Arc::clone(tape)),
        };
        cursor.set_loop(region.loop_start, region.loop_end);
        cursor.set_position(region.start_position);
        cursor.set_speed(region.ratio);
        cursor.set_direction(PlayDirection::from_forward(state.play_forward));
        cursor.set_playing(true);
        self.cursor = Some(cursor);

        self.envelope
            .set_times(state.env_attack_ms, state.env_release_ms);
        self.envelope.note_on();

        let pan = state.pan.clamp(0.0, 1.0);
        self.gains = (self.pan_law)(pan);
        self.state = GrainState { pan, ..*state };
        self.region = Some(region);
        self.active = true;
        self.last_envelope = 0.0;
        self.normalized_position = (region.start_position / region.recorded_length as f64) as f32;

        *visual = self.visual_state();
    }

    /// Next stereo frame. The voice deactivates itself once the envelope
    /// finishes or the cursor wraps its loop.
    #[inline]
    pub fn get_next_sample(&mut self) -> (f32, f32) {
        if !self.active {
            return (0.0, 0.0);
        }
        let Some(cursor) = self.cursor.as_mut() else {
            self.active = false;
            return (0.0, 0.0);
        };
        let (sample, wrapped) = cursor.process_sample();
        let env = self.envelope.next_sample();
        self.last_envelope = env;
        if let Some(region) = &self.region {
            self.normalized_position = (cursor.position() / region.recorded_length as f64) as f32;
        }
        if !self.envelope.is_active() || wrapped {
            cursor.set_playing(false);
            self.active = false;
        }
        let out = sample * env;
        (out * self.gains.0, out * self.gains.1)
    }

    /// Silences the voice immediately.
    pub fn force_stop(&mut self) {
        let mut visual = self.monitor.visual.lock();
        self.active = false;
        self.envelope.reset();
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.set_playing(false);
        }
        self.last_envelope = 0.0;
        *visual = self.visual_state();
    }

    /// Refreshes the display mirror unless a reader holds it.
    pub fn publish(&self) {
        if let Some(mut visual) = self.monitor.visual.try_lock() {
            *visual = self.visual_state();
        }
    }

    pub fn visual_state(&self) -> GrainVisualState {
        let (loop_start, loop_end, recorded) = self.region.map_or((0.0, 0.0, 0.0), |r| {
            (r.loop_start as f32, r.loop_end as f32, r.recorded_length as f32)
        });
        GrainVisualState {
            is_active: self.active,
            layer: self.state.layer,
            voice_index: self.index,
            loop_start_samples: loop_start,
            loop_end_samples: loop_end,
            recorded_length_samples: recorded,
            rate_semitones: self.state.rate_semitones,
            play_forward: self.state.play_forward,
            pan: self.state.pan,
            envelope_value: self.last_envelope,
            normalized_position: self.normalized_position,
        }
    }
}

impl std::fmt::Debug for GrainVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrainVoice")
            .field("index", &self.index)
            .field("active", &self.active)
            .field("state", &self.state)
            .finish()
    }
}
