//! Audio-thread side of the LFO slots.

use crate::lfo::LfoGenerator;
use crate::mailbox::LfoMailbox;
use crate::NUM_LFO_SLOTS;

#[derive(Debug, Clone, Default)]
struct LfoSlot {
    generator: LfoGenerator,
    enabled: bool,
    last_value: f32,
    prev_value: f32,
}

/// Runs every LFO slot once per sample.
#[derive(Debug, Clone)]
pub struct LfoBank {
    slots: [LfoSlot; NUM_LFO_SLOTS],
    sample_period: f64,
}

impl LfoBank {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| LfoSlot::default()),
            sample_period: 1.0 / 44100.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_period = if sample_rate > 0.0 {
            1.0 / sample_rate
        } else {
            0.0
        };
        for slot in &mut self.slots {
            slot.generator.reset();
            slot.last_value = 0.0;
            slot.prev_value = 0.0;
        }
    }

    /// Swaps in configs written since the last block. Returns how many
    /// slots changed.
    pub fn sync_from(&mut self, mailbox: &LfoMailbox) -> usize {
        let mut applied = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(config) = mailbox.take_pending(index) {
                slot.generator.apply_settings(config.settings);
                if !config.enabled {
                    slot.last_value = 0.0;
                    slot.prev_value = 0.0;
                }
                slot.enabled = config.enabled;
                applied += 1;
            }
        }
        applied
    }

    /// Advances every enabled slot by one sample.
    ///
    /// Returns `true` when `trigger_slot` rose from `<= 0` to `> 0`.
    #[inline]
    pub fn process_sample(&mut self, beat: f64, trigger_slot: Option<usize>) -> bool {
        let dt = self.sample_period;
        for slot in self.slots.iter_mut().filter(|slot| slot.enabled) {
            slot.prev_value = slot.last_value;
            slot.last_value = slot.generator.tick(beat, dt);
        }
        trigger_slot
            .and_then(|index| self.slots.get(index))
            .is_some_and(|slot| slot.enabled && slot.prev_value <= 0.0 && slot.last_value > 0.0)
    }

    pub fn value(&self, slot: usize) -> f32 {
        self.slots.get(slot).map_or(0.0, |slot| slot.last_value)
    }

    pub fn is_enabled(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|slot| slot.enabled)
    }

    /// Mirrors the latest outputs into the mailbox for display.
    pub fn publish(&self, mailbox: &LfoMailbox) {
        for (index, slot) in self.slots.iter().enumerate() {
            mailbox.publish(index, slot.last_value);
        }
    }
}

impl Default for LfoBank {
    fn default() -> Self {
        Self::new()
    }
}
