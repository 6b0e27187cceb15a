//! Granular looping engine.
//!
//! Audio recorded into one of six layers is replayed by up to sixteen
//! simultaneous grain voices. Grains come from four sources: requests
//! queued through an [`EngineHandle`], manual triggers, a trigger LFO's
//! rising zero crossings, and the [`PatternClock`] step sequencer.
//!
//! - [`LayerCakeEngine`]: owned by the audio thread; `prepare` then `process_block`
//! - [`EngineHandle`]: cloneable control surface for every other thread
//! - [`GrainVoice`] / [`VoicePool`]: voice playback and allocation
//! - [`PatternClock`]: record and replay grain patterns
//!
//! # Example
//!
//! ```ignore
//! use layercake_engine::prelude::*;
//!
//! let mut engine = LayerCakeEngine::builder().build()?;
//! engine.prepare(44100.0, 512, 2);
//! let handle = engine.handle();
//!
//! handle.set_record_enable(true);
//! // ... audio thread: engine.process_block(&inputs, &mut outputs, 512);
//! handle.set_record_enable(false);
//!
//! handle.trigger_grain(GrainState {
//!     loop_start_seconds: 0.25,
//!     duration_ms: 200.0,
//!     ..GrainState::on_layer(0)
//! });
//! ```

mod builder;
mod engine;
pub mod error;
mod handle;
pub mod loader;
pub mod pattern;
pub mod pool;
pub mod queue;
pub mod randomize;
mod shared;
pub mod voice;

pub use builder::EngineBuilder;
pub use engine::LayerCakeEngine;
pub use error::{Error, Result};
pub use handle::EngineHandle;
#[cfg(feature = "wav")]
pub use loader::WavFileReader;
pub use loader::{AudioFileReader, DecodedAudio};
pub use pattern::{
    ClockControls, ClockMode, GrainBuilder, PatternClock, PatternSnapshot, MAX_PATTERN_LENGTH,
};
pub use pool::{VoicePool, NUM_VOICES};
pub use shared::NUM_LAYERS;
pub use voice::{GrainRegion, GrainVoice, VoiceMonitor};

pub mod prelude {
    pub use crate::{
        ClockMode, EngineHandle, GrainBuilder, LayerCakeEngine, PatternClock, PatternSnapshot,
    };
    pub use layercake_core::{GrainState, GrainVisualState, LayerBufferSnapshot};
}
