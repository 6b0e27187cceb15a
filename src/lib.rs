//! # LayerCake - Granular Looping Engine
//!
//! Record audio into six layers, then replay it as overlapping grains.
//!
//! ## Architecture
//!
//! LayerCake is an umbrella crate over:
//! - **layercake-core** - Tape buffers, read/write cursors, envelope, metro, pan laws, tempo sync
//! - **layercake-automation** - Eight LFO slots with trigger-crossing detection
//! - **layercake-engine** - Voice pool, trigger queue, pattern clock, layer loading, the engine itself
//!
//! ## Quick Start
//!
//! ```ignore
//! use layercake::prelude::*;
//!
//! let mut engine = LayerCakeEngine::builder()
//!     .max_layer_duration_secs(10.0)
//!     .tempo(96.0)
//!     .build()?;
//! engine.prepare(48000.0, 256, 2);
//!
//! let handle = engine.handle();
//! handle.set_record_enable(true);
//! // audio thread: engine.process_block(&inputs, &mut outputs, 256);
//! handle.set_record_enable(false);
//!
//! handle.trigger_grain(GrainState {
//!     duration_ms: 250.0,
//!     rate_semitones: -12.0,
//!     ..GrainState::on_layer(0)
//! });
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - `wav`
//! - `wav` - Load WAV files into layers

pub use layercake_automation as automation;
pub use layercake_core as core;
pub use layercake_engine as engine;

pub use layercake_automation::{LfoSettings, LfoShape, LfoSlotConfig, NUM_LFO_SLOTS};
pub use layercake_core::{
    EngineConfig, GrainState, GrainVisualState, InternalSync, LayerBufferSnapshot, Panner,
    SyncStrategy, TapeBuffer,
};
pub use layercake_engine::{
    ClockControls, ClockMode, EngineBuilder, EngineHandle, GrainBuilder, LayerCakeEngine,
    PatternClock, PatternSnapshot, NUM_LAYERS, NUM_VOICES,
};

mod error;

pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        ClockMode, EngineBuilder, EngineConfig, EngineHandle, GrainBuilder, GrainState,
        GrainVisualState, LayerBufferSnapshot, LayerCakeEngine, LfoSettings, LfoShape,
        LfoSlotConfig, PatternClock, PatternSnapshot,
    };
}
