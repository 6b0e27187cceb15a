//! Recording cursor.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use atomic_float::AtomicF32;

use crate::tape::TapeBuffer;

const FOLLOW_FIRST_CHANNEL: usize = usize::MAX;

/// Writes incoming audio into the tape it is bound to.
///
/// All state is atomic: the audio thread calls [`process_sample`] while
/// control threads toggle recording or rebind to another layer. Rebinding
/// must be serialized by the caller (the engine holds its record lock).
///
/// [`process_sample`]: WriteCursor::process_sample
pub struct WriteCursor {
    tape: ArcSwap<TapeBuffer>,
    position: AtomicUsize,
    loop_length: AtomicUsize,
    record_enabled: AtomicBool,
    overdub_mix: AtomicF32,
    input_channel: AtomicUsize,
    capacity_reached: AtomicBool,
}

impl WriteCursor {
    pub fn new(tape: Arc<TapeBuffer>) -> Self {
        Self {
            tape: ArcSwap::new(tape),
            position: AtomicUsize::new(0),
            loop_length: AtomicUsize::new(0),
            record_enabled: AtomicBool::new(false),
            overdub_mix: AtomicF32::new(0.0),
            input_channel: AtomicUsize::new(FOLLOW_FIRST_CHANNEL),
            capacity_reached: AtomicBool::new(false),
        }
    }

    /// Binds to a different tape. Position and loop length start over.
    pub fn rebind(&self, tape: Arc<TapeBuffer>) {
        self.tape.store(tape);
        self.reset_position();
        self.loop_length.store(0, Ordering::Release);
    }

    pub fn tape(&self) -> Arc<TapeBuffer> {
        self.tape.load_full()
    }

    pub fn is_bound_to(&self, tape: &Arc<TapeBuffer>) -> bool {
        Arc::ptr_eq(&self.tape.load(), tape)
    }

    pub fn set_record_enabled(&self, enabled: bool) {
        self.record_enabled.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn is_record_enabled(&self) -> bool {
        self.record_enabled.load(Ordering::Acquire)
    }

    /// 0.0 replaces existing audio, 1.0 adds to it.
    pub fn set_overdub_mix(&self, mix: f32) {
        self.overdub_mix.store(mix.clamp(0.0, 1.0), Ordering::Release);
    }

    pub fn overdub_mix(&self) -> f32 {
        self.overdub_mix.load(Ordering::Acquire)
    }

    pub fn set_input_channel(&self, channel: Option<usize>) {
        self.input_channel
            .store(channel.unwrap_or(FOLLOW_FIRST_CHANNEL), Ordering::Release);
    }

    pub fn input_channel(&self) -> Option<usize> {
        match self.input_channel.load(Ordering::Acquire) {
            FOLLOW_FIRST_CHANNEL => None,
            channel => Some(channel),
        }
    }

    pub fn reset_position(&self) {
        self.position.store(0, Ordering::Release);
        self.capacity_reached.store(false, Ordering::Release);
    }

    /// One past the last sample written.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    /// Loop length fixed by the last [`finalize_recording`](Self::finalize_recording).
    pub fn loop_length(&self) -> usize {
        self.loop_length.load(Ordering::Acquire)
    }

    /// Whether a write was refused because the tape was full.
    pub fn capacity_reached(&self) -> bool {
        self.capacity_reached.load(Ordering::Acquire)
    }

    /// Records `input` at `absolute_position` when recording is enabled.
    ///
    /// Returns `true` if the sample was stored. Writes past the tape's
    /// capacity are dropped and latch [`capacity_reached`](Self::capacity_reached).
    #[inline]
    pub fn process_sample(&self, input: f32, absolute_position: usize) -> bool {
        if !self.record_enabled.load(Ordering::Acquire) {
            return false;
        }
        let tape = self.tape.load();
        if !tape.overdub(absolute_position, input, self.overdub_mix.load(Ordering::Relaxed)) {
            self.capacity_reached.store(true, Ordering::Release);
            return false;
        }
        tape.extend_recorded_length(absolute_position + 1);
        self.position
            .fetch_max(absolute_position + 1, Ordering::AcqRel);
        true
    }

    /// Ends the take. The loop length becomes `final_position` clamped to
    /// capacity. Returns the stored loop length.
    pub fn finalize_recording(&self, final_position: usize) -> usize {
        let tape = self.tape.load();
        let length = final_position.min(tape.capacity());
        self.loop_length.store(length, Ordering::Release);
        self.record_enabled.store(false, Ordering::Release);
        if length > 0 {
            tape.extend_recorded_length(length);
        }
        length
    }
}

impl std::fmt::Debug for WriteCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCursor")
            .field("position", &self.position())
            .field("loop_length", &self.loop_length())
            .field("record_enabled", &self.is_record_enabled())
            .field("overdub_mix", &self.overdub_mix())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn recording_cursor(capacity: usize) -> (Arc<TapeBuffer>, WriteCursor) {
        let tape = Arc::new(TapeBuffer::with_capacity(capacity));
        let cursor = WriteCursor::new(tape.clone());
        cursor.set_record_enabled(true);
        (tape, cursor)
    }

    #[test]
    fn test_disabled_cursor_ignores_input() {
        let (tape, cursor) = recording_cursor(8);
        cursor.set_record_enabled(false);
        assert!(!cursor.process_sample(1.0, 0));
        assert!(!tape.has_recorded());
    }

    #[test]
    fn test_first_write_marks_recorded() {
        let (tape, cursor) = recording_cursor(8);
        assert!(cursor.process_sample(0.5, 3));
        assert!(tape.has_recorded());
        assert_eq!(tape.recorded_length(), 4);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_overdub_add_and_replace() {
        let (tape, cursor) = recording_cursor(4);
        cursor.process_sample(0.25, 0);

        cursor.set_overdub_mix(1.0);
        cursor.process_sample(0.5, 0);
        assert_relative_eq!(tape.read(0), 0.75);

        cursor.set_overdub_mix(0.0);
        cursor.process_sample(0.1, 0);
        assert_relative_eq!(tape.read(0), 0.1);
    }

    #[test]
    fn test_writes_past_capacity_latch() {
        let (tape, cursor) = recording_cursor(2);
        assert!(cursor.process_sample(1.0, 1));
        assert!(!cursor.process_sample(1.0, 2));
        assert!(cursor.capacity_reached());
        assert_eq!(tape.recorded_length(), 2);
    }

    #[test]
    fn test_finalize_clamps_to_capacity() {
        let (tape, cursor) = recording_cursor(100);
        for i in 0..50 {
            cursor.process_sample(0.1, i);
        }
        assert_eq!(cursor.finalize_recording(500), 100);
        assert!(!cursor.is_record_enabled());
        assert_eq!(cursor.loop_length(), 100);
        assert!(tape.has_audio());
    }

    #[test]
    fn test_rebind_resets_position() {
        let (_, cursor) = recording_cursor(8);
        cursor.process_sample(1.0, 5);
        let other = Arc::new(TapeBuffer::with_capacity(8));
        cursor.rebind(other.clone());
        assert_eq!(cursor.position(), 0);
        assert!(cursor.is_bound_to(&other));
    }

    #[test]
    fn test_input_channel_follow_first() {
        let (_, cursor) = recording_cursor(1);
        assert_eq!(cursor.input_channel(), None);
        cursor.set_input_channel(Some(3));
        assert_eq!(cursor.input_channel(), Some(3));
    }
}
