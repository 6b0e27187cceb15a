//! Control-to-audio grain trigger queue.

use layercake_core::GrainState;
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

/// Pushing side, held by control threads (serialized by the caller).
pub struct TriggerProducer {
    producer: HeapProd<GrainState>,
}

impl TriggerProducer {
    /// Returns `false` when the queue is full; the request is dropped.
    #[inline]
    pub fn push(&mut self, state: GrainState) -> bool {
        self.producer.try_push(state).is_ok()
    }

    pub fn free_len(&self) -> usize {
        self.producer.vacant_len()
    }
}

/// Draining side, owned by the audio thread.
pub struct TriggerConsumer {
    consumer: HeapCons<GrainState>,
}

impl TriggerConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<GrainState> {
        self.consumer.try_pop()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

/// Creates a bounded trigger queue holding up to `capacity` requests.
pub fn trigger_queue(capacity: usize) -> (TriggerProducer, TriggerConsumer) {
    let (producer, consumer) = HeapRb::new(capacity).split();
    (TriggerProducer { producer }, TriggerConsumer { consumer })
}
