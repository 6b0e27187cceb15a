//! Core building blocks for the LayerCake granular looper.
//!
//! - [`TapeBuffer`]: per-layer mono recording storage shared between threads
//! - [`WriteCursor`] / [`ReadCursor`]: record and fractional-rate playback positions
//! - [`Envelope`]: attack-release grain envelope
//! - [`Metro`]: sample-counting metronome
//! - [`SyncStrategy`] / [`InternalSync`]: tempo and beat sources
//! - [`GrainState`]: the grain request passed between every component
//!
//! # Example
//!
//! ```ignore
//! use layercake_core::{ReadCursor, TapeBuffer, WriteCursor};
//! use std::sync::Arc;
//!
//! let tape = Arc::new(TapeBuffer::new());
//! tape.allocate(44100.0, 10.0);
//!
//! let writer = WriteCursor::new(tape.clone());
//! writer.set_record_enabled(true);
//! writer.process_sample(0.5, 0);
//!
//! let mut reader = ReadCursor::new(tape);
//! reader.set_loop(0.0, 1.0);
//! reader.set_playing(true);
//! let (sample, wrapped) = reader.process_sample();
//! ```

pub mod config;
pub mod cursor;
pub mod envelope;
pub mod error;
pub mod grain;
pub mod metro;
pub mod pan;
pub mod retired;
pub mod sync;
pub mod tape;

pub use config::{db_to_gain, EngineConfig, MAX_LAYER_DURATION_SECS, TRIGGER_QUEUE_CAPACITY};
pub use cursor::{PlayDirection, ReadCursor, WriteCursor};
pub use envelope::{Envelope, EnvelopeStage};
pub use error::{Error, Result};
pub use grain::{GrainState, GrainVisualState, LayerBufferSnapshot};
pub use metro::{Metro, MIN_PERIOD_MS};
pub use pan::{equal_power_gains, linear_gains, PanLaw, Panner};
pub use retired::Retired;
pub use sync::{InternalSync, SyncStrategy, MAX_TEMPO_BPM, MIN_TEMPO_BPM};
pub use tape::TapeBuffer;
