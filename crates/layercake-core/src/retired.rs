//! Deferred release of values swapped out from under the audio thread.
//!
//! When a control thread replaces an `ArcSwap`ed value, the audio thread may
//! still hold a guard on the old one; letting that guard drop the last
//! reference would free memory on the audio thread. Control threads park the
//! old `Arc` here instead and release it on a later call, once nothing else
//! holds it.

use std::sync::Arc;

use parking_lot::Mutex;

/// Control-side holding area for replaced values.
pub struct Retired<T> {
    parked: Mutex<Vec<Arc<T>>>,
}

impl<T> Retired<T> {
    pub fn new() -> Self {
        Self {
            parked: Mutex::new(Vec::new()),
        }
    }

    /// Parks `old`, then releases everything no other thread still holds.
    pub fn retire(&self, old: Arc<T>) {
        let mut parked = self.parked.lock();
        parked.push(old);
        parked.retain(|value| Arc::strong_count(value) > 1);
    }

    /// Releases every parked value no other thread still holds.
    pub fn collect(&self) {
        self.parked
            .lock()
            .retain(|value| Arc::strong_count(value) > 1);
    }

    /// Values still waiting on another holder.
    pub fn pending(&self) -> usize {
        self.parked.lock().len()
    }
}

impl<T> Default for Retired<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Retired<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retired")
            .field("pending", &self.pending())
            .finish()
    }
}
