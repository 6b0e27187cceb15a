//! Control-thread side of the LFO slots.

use std::sync::atomic::{AtomicBool, Ordering};

use atomic_float::AtomicF32;
use layercake_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::lfo::LfoSettings;
use crate::NUM_LFO_SLOTS;

/// Settings plus on/off for one slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LfoSlotConfig {
    pub settings: LfoSettings,
    pub enabled: bool,
}

/// Pending slot configs and display values shared with the audio thread.
///
/// Writers store a config and raise the slot's dirty flag; the audio thread
/// swaps it in at the next block boundary via [`LfoBank::sync_from`].
///
/// [`LfoBank::sync_from`]: crate::LfoBank::sync_from
pub struct LfoMailbox {
    pending: [spin::Mutex<LfoSlotConfig>; NUM_LFO_SLOTS],
    dirty: [AtomicBool; NUM_LFO_SLOTS],
    visuals: [AtomicF32; NUM_LFO_SLOTS],
}

impl LfoMailbox {
    pub fn new() -> Self {
        Self {
            pending: std::array::from_fn(|_| spin::Mutex::new(LfoSlotConfig::default())),
            dirty: std::array::from_fn(|_| AtomicBool::new(false)),
            visuals: std::array::from_fn(|_| AtomicF32::new(0.0)),
        }
    }

    pub fn update_slot(&self, slot: usize, config: LfoSlotConfig) -> Result<()> {
        let pending = self.pending.get(slot).ok_or(Error::InvalidLfoSlot(slot))?;
        *pending.lock() = LfoSlotConfig {
            settings: config.settings.sanitized(),
            enabled: config.enabled,
        };
        self.dirty[slot].store(true, Ordering::Release);
        Ok(())
    }

    pub fn set_slot_enabled(&self, slot: usize, enabled: bool) -> Result<()> {
        let pending = self.pending.get(slot).ok_or(Error::InvalidLfoSlot(slot))?;
        pending.lock().enabled = enabled;
        self.dirty[slot].store(true, Ordering::Release);
        Ok(())
    }

    /// Latest config written for `slot` (applied or not).
    pub fn slot_config(&self, slot: usize) -> Option<LfoSlotConfig> {
        self.pending.get(slot).map(|pending| *pending.lock())
    }

    /// Last output of `slot`, refreshed once per audio block.
    pub fn visual_value(&self, slot: usize) -> f32 {
        self.visuals.get(slot).map_or(0.0, |visual| visual.load(Ordering::Relaxed))
    }

    /// Audio thread: takes the pending config if the slot is dirty and the
    /// writer is not mid-update. A contended slot stays dirty for next block.
    pub(crate) fn take_pending(&self, slot: usize) -> Option<LfoSlotConfig> {
        if !self.dirty[slot].swap(false, Ordering::AcqRel) {
            return None;
        }
        match self.pending[slot].try_lock() {
            Some(config) => Some(*config),
            None => {
                self.dirty[slot].store(true, Ordering::Release);
                None
            }
        }
    }

    pub(crate) fn publish(&self, slot: usize, value: f32) {
        self.visuals[slot].store(value, Ordering::Relaxed);
    }
}

impl Default for LfoMailbox {
    fn default() -> Self {
        Self::new()
    }
}
