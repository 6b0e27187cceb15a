//! Error types for layercake-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid layer index: {0}")]
    InvalidLayer(usize),

    #[error("Invalid LFO slot: {0}")]
    InvalidLfoSlot(usize),

    #[error("Invalid tempo: {0} BPM")]
    InvalidTempo(f64),

    #[error("Engine not prepared")]
    NotPrepared,

    #[error("Audio source contains no samples")]
    EmptyAudio,

    #[error("Requested {requested} samples but capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
}
