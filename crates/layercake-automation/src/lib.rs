//! LFO automation for LayerCake.
//!
//! - [`LfoGenerator`]: one free-running or beat-clocked LFO
//! - [`LfoMailbox`]: control-thread side; pending configs and display values
//! - [`LfoBank`]: audio-thread side; runs every slot and detects trigger crossings
//!
//! Configs written to the mailbox are picked up by the bank at the next
//! block boundary, so a generator never changes shape mid-block.

pub mod bank;
pub mod lfo;
pub mod mailbox;

pub use bank::LfoBank;
pub use lfo::{LfoGenerator, LfoSettings, LfoShape};
pub use mailbox::{LfoMailbox, LfoSlotConfig};

/// Number of LFO slots per engine.
pub const NUM_LFO_SLOTS: usize = 8;
