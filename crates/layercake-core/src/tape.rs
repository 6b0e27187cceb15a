//! Shared per-layer recording storage.
//!
//! A [`TapeBuffer`] is written by exactly one [`WriteCursor`](crate::WriteCursor)
//! on the audio thread and read concurrently by any number of
//! [`ReadCursor`](crate::ReadCursor)s. Sample slots are relaxed atomics, so a
//! reader racing the writer sees either the old or the new value of a slot,
//! never a torn one. Structural changes (allocate, clear, load) happen on
//! control threads under the buffer's own lock and publish new storage through
//! an [`ArcSwap`], so readers holding the old storage keep reading valid memory.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use atomic_float::AtomicF32;
use parking_lot::Mutex;

use crate::grain::LayerBufferSnapshot;
use crate::retired::Retired;

type Storage = Box<[AtomicF32]>;

fn storage(len: usize) -> Storage {
    (0..len).map(|_| AtomicF32::new(0.0)).collect()
}

/// Mono sample storage for one layer.
pub struct TapeBuffer {
    samples: ArcSwap<Storage>,
    /// Storage replaced while a reader may still hold it.
    retired: Retired<Storage>,
    recorded_length: AtomicUsize,
    has_recorded: AtomicBool,
    lock: Mutex<()>,
}

impl TapeBuffer {
    /// Creates an unallocated (zero-capacity) buffer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: ArcSwap::from_pointee(storage(capacity)),
            retired: Retired::new(),
            recorded_length: AtomicUsize::new(0),
            has_recorded: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    /// Sizes the buffer to hold `max_seconds` of audio at `sample_rate`.
    ///
    /// Contents and recorded state are discarded.
    pub fn allocate(&self, sample_rate: f64, max_seconds: f64) {
        let capacity = (sample_rate * max_seconds).max(0.0).ceil() as usize;
        let _guard = self.lock.lock();
        self.replace_storage(capacity);
        self.recorded_length.store(0, Ordering::Release);
        self.has_recorded.store(false, Ordering::Release);
    }

    /// Zeroes every sample and forgets any recording.
    pub fn clear(&self) {
        let _guard = self.lock.lock();
        self.clear_locked();
    }

    /// Publishes fresh storage; the old one is released off the audio thread.
    fn replace_storage(&self, capacity: usize) {
        let old = self.samples.swap(Arc::new(storage(capacity)));
        self.retired.retire(old);
    }

    /// Storage buffers replaced but still held by a reader.
    pub fn retired_storage(&self) -> usize {
        self.retired.collect();
        self.retired.pending()
    }

    fn clear_locked(&self) {
        for slot in self.samples.load().iter() {
            slot.store(0.0, Ordering::Relaxed);
        }
        self.recorded_length.store(0, Ordering::Release);
        self.has_recorded.store(false, Ordering::Release);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples.load().len()
    }

    #[inline]
    pub fn recorded_length(&self) -> usize {
        self.recorded_length.load(Ordering::Acquire)
    }

    #[inline]
    pub fn has_recorded(&self) -> bool {
        self.has_recorded.load(Ordering::Acquire)
    }

    /// True once something was recorded and the recording is non-empty.
    #[inline]
    pub fn has_audio(&self) -> bool {
        self.has_recorded() && self.recorded_length() > 0
    }

    /// Reads one sample; out-of-range indices read as silence.
    #[inline]
    pub fn read(&self, index: usize) -> f32 {
        self.samples
            .load()
            .get(index)
            .map_or(0.0, |slot| slot.load(Ordering::Relaxed))
    }

    /// Linearly interpolated read at a fractional position.
    ///
    /// The upper neighbour wraps to the start once it passes the recorded
    /// length, so the end of a loop blends into its beginning.
    #[inline]
    pub fn read_interpolated(&self, position: f64) -> f32 {
        let samples = self.samples.load();
        let len = samples.len();
        if len == 0 || !(position >= 0.0) {
            return 0.0;
        }
        let index0 = (position as usize).min(len - 1);
        let frac = (position - index0 as f64) as f32;
        let s0 = samples[index0].load(Ordering::Relaxed);
        if frac <= 0.0 {
            return s0;
        }
        let wrap_at = match self.recorded_length().min(len) {
            0 => len,
            recorded => recorded,
        };
        let index1 = if index0 + 1 >= wrap_at { 0 } else { index0 + 1 };
        let s1 = samples[index1].load(Ordering::Relaxed);
        s0 + (s1 - s0) * frac
    }

    /// Stores one sample. Returns `false` when `index` is past capacity.
    ///
    /// Only the bound write cursor calls this.
    #[inline]
    pub fn write(&self, index: usize, value: f32) -> bool {
        match self.samples.load().get(index) {
            Some(slot) => {
                slot.store(value, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Overdubs `input` at `index`: `input + existing * mix`.
    #[inline]
    pub fn overdub(&self, index: usize, input: f32, mix: f32) -> bool {
        match self.samples.load().get(index) {
            Some(slot) => {
                let existing = slot.load(Ordering::Relaxed);
                slot.store(input + existing * mix, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Grows the recorded length to cover `length` samples (clamped to capacity).
    pub fn extend_recorded_length(&self, length: usize) {
        let length = length.min(self.capacity());
        self.recorded_length.fetch_max(length, Ordering::AcqRel);
        if length > 0 {
            self.has_recorded.store(true, Ordering::Release);
        }
    }

    pub fn mark_recorded(&self) {
        self.has_recorded.store(true, Ordering::Release);
    }

    /// Copies the recorded region out under the buffer lock.
    pub fn snapshot(&self) -> LayerBufferSnapshot {
        let _guard = self.lock.lock();
        let samples = self.samples.load();
        let recorded = self.recorded_length().min(samples.len());
        LayerBufferSnapshot {
            samples: samples[..recorded]
                .iter()
                .map(|slot| slot.load(Ordering::Relaxed))
                .collect(),
            recorded_length: recorded,
            has_audio: self.has_recorded() && recorded > 0,
        }
    }

    /// Replaces the buffer contents with `snapshot`.
    ///
    /// Storage grows when the snapshot is longer than the current capacity.
    /// A snapshot without audio leaves the buffer cleared.
    pub fn restore(&self, snapshot: &LayerBufferSnapshot) {
        let _guard = self.lock.lock();
        if !snapshot.has_audio || snapshot.samples.is_empty() {
            self.clear_locked();
            return;
        }
        if snapshot.samples.len() > self.capacity() {
            self.replace_storage(snapshot.samples.len());
        }
        let kept = self.copy_in_locked(&snapshot.samples);
        let recorded = kept.min(snapshot.recorded_length);
        self.recorded_length.store(recorded, Ordering::Release);
        self.has_recorded.store(recorded > 0, Ordering::Release);
    }

    /// Copies `source` in from the start, truncating to capacity and
    /// zero-filling the remainder. Returns the number of samples kept.
    pub fn load(&self, source: &[f32]) -> usize {
        let _guard = self.lock.lock();
        let kept = self.copy_in_locked(source);
        self.recorded_length.store(kept, Ordering::Release);
        self.has_recorded.store(kept > 0, Ordering::Release);
        kept
    }

    fn copy_in_locked(&self, source: &[f32]) -> usize {
        let samples = self.samples.load();
        let kept = source.len().min(samples.len());
        for (slot, &value) in samples.iter().zip(source[..kept].iter()) {
            slot.store(value, Ordering::Relaxed);
        }
        for slot in samples[kept..].iter() {
            slot.store(0.0, Ordering::Relaxed);
        }
        kept
    }
}

impl Default for TapeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TapeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapeBuffer")
            .field("capacity", &self.capacity())
            .field("recorded_length", &self.recorded_length())
            .field("has_recorded", &self.has_recorded())
            .finish()
    }
}
