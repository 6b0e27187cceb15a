//! Playback cursor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tape::TapeBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayDirection {
    #[default]
    Forward,
    Reverse,
}

impl PlayDirection {
    pub fn from_forward(forward: bool) -> Self {
        if forward {
            Self::Forward
        } else {
            Self::Reverse
        }
    }

    #[inline]
    fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }
}

/// Fractional-rate reader looping over `[loop_start, loop_end)` of a tape.
///
/// Owned by a single voice; never shared across threads.
#[derive(Debug, Clone)]
pub struct ReadCursor {
    tape: Arc<TapeBuffer>,
    position: f64,
    loop_start: f64,
    loop_end: f64,
    speed: f64,
    direction: PlayDirection,
    playing: bool,
}

impl ReadCursor {
    pub fn new(tape: Arc<TapeBuffer>) -> Self {
        Self {
            tape,
            position: 0.0,
            loop_start: 0.0,
            loop_end: 0.0,
            speed: 1.0,
            direction: PlayDirection::Forward,
            playing: false,
        }
    }

    pub fn tape(&self) -> &Arc<TapeBuffer> {
        &self.tape
    }

    pub fn set_loop(&mut self, start: f64, end: f64) {
        self.loop_start = start;
        self.loop_end = end;
    }

    pub fn loop_start(&self) -> f64 {
        self.loop_start
    }

    pub fn loop_end(&self) -> f64 {
        self.loop_end
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Samples advanced per output sample.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.abs();
    }

    pub fn set_direction(&mut self, direction: PlayDirection) {
        self.direction = direction;
    }

    pub fn direction(&self) -> PlayDirection {
        self.direction
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Reads the sample at the current position, then advances.
    ///
    /// Returns the sample and whether the advance wrapped around the loop.
    /// Silence (without advancing) while stopped or before anything was
    /// recorded.
    #[inline]
    pub fn process_sample(&mut self) -> (f32, bool) {
        if !self.playing || !self.tape.has_audio() {
            return (0.0, false);
        }
        let sample = self.tape.read_interpolated(self.position);
        let wrapped = self.advance();
        (sample, wrapped)
    }

    fn advance(&mut self) -> bool {
        let length = self.loop_end - self.loop_start;
        if length <= 0.0 {
            return false;
        }
        self.position += self.speed * self.direction.sign();
        if self.position < self.loop_start {
            self.position += length;
            true
        } else if self.position >= self.loop_end {
            self.position -= length;
            true
        } else {
            false
        }
    }
}
