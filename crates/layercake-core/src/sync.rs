//! Tempo and beat-position sources.
//!
//! The engine reads tempo, beat and play state through [`SyncStrategy`] so
//! an external clock can replace the built-in [`InternalSync`].

use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF64;

pub const MIN_TEMPO_BPM: f64 = 10.0;
pub const MAX_TEMPO_BPM: f64 = 999.0;

/// Source of musical time.
///
/// All methods take `&self`; the audio thread calls [`process`] once per
/// block while control threads change tempo or play state.
///
/// [`process`]: SyncStrategy::process
pub trait SyncStrategy: Send + Sync {
    fn prepare(&self, sample_rate: f64, block_size: usize);

    /// Advances time by one block. The engine calls this at the top of each
    /// block, before reading the beat.
    fn process(&self, num_samples: usize, sample_rate: f64);

    fn tempo(&self) -> f64;
    fn set_tempo(&self, bpm: f64);

    /// Beat position as of the last [`process`](SyncStrategy::process).
    fn current_beat(&self) -> f64;

    /// Position within a bar of `quantum` beats.
    fn phase(&self, quantum: f64) -> f64 {
        if quantum <= 0.0 {
            return 0.0;
        }
        self.current_beat().rem_euclid(quantum)
    }

    fn is_playing(&self) -> bool;
    fn set_playing(&self, playing: bool);

    /// Returns the beat position to zero.
    fn request_reset(&self);
}

/// Free-running clock driven by the engine's own sample count.
#[derive(Debug)]
pub struct InternalSync {
    bpm: AtomicF64,
    beat: AtomicF64,
    playing: AtomicBool,
}

impl InternalSync {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: AtomicF64::new(bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM)),
            beat: AtomicF64::new(0.0),
            playing: AtomicBool::new(true),
        }
    }
}

impl Default for InternalSync {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl SyncStrategy for InternalSync {
    fn prepare(&self, _sample_rate: f64, _block_size: usize) {}

    fn process(&self, num_samples: usize, sample_rate: f64) {
        if !self.playing.load(Ordering::Acquire) || sample_rate <= 0.0 {
            return;
        }
        let beats_per_sample = self.bpm.load(Ordering::Acquire) / 60.0 / sample_rate;
        self.beat.fetch_add(beats_per_sample * num_samples as f64, Ordering::AcqRel);
    }

    fn tempo(&self) -> f64 {
        self.bpm.load(Ordering::Acquire)
    }

    /// Clamped to 10..999 BPM.
    fn set_tempo(&self, bpm: f64) {
        if bpm.is_finite() {
            self.bpm.store(bpm.clamp(MIN_TEMPO_BPM, MAX_TEMPO_BPM), Ordering::Release);
        }
    }

    fn current_beat(&self) -> f64 {
        self.beat.load(Ordering::Acquire)
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    fn request_reset(&self) {
        self.beat.store(0.0, Ordering::Release);
    }
}
