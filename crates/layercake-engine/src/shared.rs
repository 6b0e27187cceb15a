//! State shared between the audio-thread engine and its handles.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use atomic_float::{AtomicF32, AtomicF64};
use layercake_automation::LfoMailbox;
use layercake_core::{EngineConfig, GrainState, Retired, SyncStrategy, TapeBuffer, WriteCursor};

use crate::pattern::ClockControls;
use crate::queue::TriggerProducer;
use crate::voice::VoiceMonitor;

/// Number of recordable layers.
pub const NUM_LAYERS: usize = 6;

const NO_TRIGGER_LFO: usize = usize::MAX;

/// Guarded by the record lock: which layer the write cursor feeds.
#[derive(Debug)]
pub(crate) struct RecordTarget {
    pub layer: usize,
}

pub(crate) struct EngineShared {
    pub config: EngineConfig,
    pub layers: [Arc<TapeBuffer>; NUM_LAYERS],
    pub write_cursor: WriteCursor,
    pub record_lock: spin::Mutex<RecordTarget>,
    pub record_enabled: AtomicBool,
    /// Next absolute sample index the audio thread records to.
    pub record_cursor: AtomicUsize,
    pub triggers: spin::Mutex<TriggerProducer>,
    pub lfo: LfoMailbox,
    trigger_lfo: AtomicUsize,
    pub manual_template: spin::Mutex<GrainState>,
    pub manual_reverse_probability: AtomicF32,
    pub manual_requests: AtomicU32,
    pub master_gain_db: AtomicF32,
    pub normalize_on_load: AtomicBool,
    pub sync: ArcSwap<Box<dyn SyncStrategy>>,
    /// Replaced tempo sources, released once the audio thread lets go.
    pub retired_sync: Retired<Box<dyn SyncStrategy>>,
    pub clock: Arc<ClockControls>,
    pub monitors: Vec<Arc<VoiceMonitor>>,
    pub prepared: AtomicBool,
    pub sample_rate: AtomicF64,
    pub block_size: AtomicUsize,
}

impl EngineShared {
    pub fn new(
        config: EngineConfig,
        triggers: TriggerProducer,
        sync: Box<dyn SyncStrategy>,
        clock: Arc<ClockControls>,
        monitors: Vec<Arc<VoiceMonitor>>,
    ) -> Self {
        let layers: [Arc<TapeBuffer>; NUM_LAYERS] =
            std::array::from_fn(|_| Arc::new(TapeBuffer::new()));
        let write_cursor = WriteCursor::new(Arc::clone(&layers[0]));
        write_cursor.set_overdub_mix(config.overdub_mix);
        write_cursor.set_input_channel(config.record_input_channel);
        Self {
            master_gain_db: AtomicF32::new(config.master_gain_db),
            normalize_on_load: AtomicBool::new(config.normalize_on_load),
            config,
            layers,
            write_cursor,
            record_lock: spin::Mutex::new(RecordTarget { layer: 0 }),
            record_enabled: AtomicBool::new(false),
            record_cursor: AtomicUsize::new(0),
            triggers: spin::Mutex::new(triggers),
            lfo: LfoMailbox::new(),
            trigger_lfo: AtomicUsize::new(NO_TRIGGER_LFO),
            manual_template: spin::Mutex::new(GrainState::default()),
            manual_reverse_probability: AtomicF32::new(0.0),
            manual_requests: AtomicU32::new(0),
            sync: ArcSwap::from_pointee(sync),
            retired_sync: Retired::new(),
            clock,
            monitors,
            prepared: AtomicBool::new(false),
            sample_rate: AtomicF64::new(0.0),
            block_size: AtomicUsize::new(0),
        }
    }

    pub fn layer(&self, index: usize) -> Option<&Arc<TapeBuffer>> {
        self.layers.get(index)
    }

    pub fn trigger_lfo(&self) -> Option<usize> {
        match self.trigger_lfo.load(Ordering::Acquire) {
            NO_TRIGGER_LFO => None,
            slot => Some(slot),
        }
    }

    pub fn set_trigger_lfo(&self, slot: Option<usize>) {
        self.trigger_lfo
            .store(slot.unwrap_or(NO_TRIGGER_LFO), Ordering::Release);
    }
}
