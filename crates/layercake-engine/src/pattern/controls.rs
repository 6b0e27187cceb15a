//! Cross-thread controls for a [`PatternClock`](super::PatternClock).

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use layercake_core::GrainState;

use super::{ClockMode, PatternSnapshot};

#[derive(Debug, Default)]
struct ClockRequests {
    mode: Option<ClockMode>,
    period_ms: Option<f64>,
    pattern_length: Option<usize>,
    skip_probability: Option<f32>,
    snapshot: Option<PatternSnapshot>,
    snapshot_pending: bool,
}

/// Requests taken by the clock at a block boundary.
#[derive(Debug, Default)]
pub(crate) struct PendingChanges<'a> {
    pub mode: Option<ClockMode>,
    pub period_ms: Option<f64>,
    pub pattern_length: Option<usize>,
    pub skip_probability: Option<f32>,
    pub snapshot: Option<&'a PatternSnapshot>,
}

/// Shared between the clock (audio thread) and control threads.
///
/// Flags take effect immediately. Mode, period, length, skip probability
/// and snapshot changes are queued and applied by the clock at the next
/// block boundary.
#[derive(Debug)]
pub struct ClockControls {
    enabled: AtomicBool,
    auto_fire_enabled: AtomicBool,
    auto_fire_state: spin::Mutex<GrainState>,
    requests: spin::Mutex<ClockRequests>,
    requests_pending: AtomicBool,
    current_step: AtomicUsize,
    mode: AtomicU8,
}

impl ClockControls {
    pub(crate) fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            auto_fire_enabled: AtomicBool::new(false),
            auto_fire_state: spin::Mutex::new(GrainState::default()),
            requests: spin::Mutex::new(ClockRequests::default()),
            requests_pending: AtomicBool::new(false),
            current_step: AtomicUsize::new(0),
            mode: AtomicU8::new(ClockMode::Idle as u8),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// When set, an empty step fires the auto-fire state instead.
    pub fn set_auto_fire_enabled(&self, enabled: bool) {
        self.auto_fire_enabled.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn is_auto_fire_enabled(&self) -> bool {
        self.auto_fire_enabled.load(Ordering::Acquire)
    }

    pub fn set_auto_fire_state(&self, state: GrainState) {
        *self.auto_fire_state.lock() = state;
    }

    pub fn auto_fire_state(&self) -> GrainState {
        *self.auto_fire_state.lock()
    }

    /// Audio thread: the fallback state, if uncontended.
    pub(crate) fn try_auto_fire_state(&self) -> Option<GrainState> {
        self.auto_fire_state.try_lock().map(|state| *state)
    }

    /// Audio thread: remembers the latest live state as the fallback.
    pub(crate) fn try_store_auto_fire_state(&self, state: GrainState) {
        if let Some(mut slot) = self.auto_fire_state.try_lock() {
            *slot = state;
        }
    }

    pub fn request_mode(&self, mode: ClockMode) {
        self.request(|requests| requests.mode = Some(mode));
    }

    pub fn request_period_ms(&self, period_ms: f64) {
        self.request(|requests| requests.period_ms = Some(period_ms));
    }

    pub fn request_pattern_length(&self, length: usize) {
        self.request(|requests| requests.pattern_length = Some(length));
    }

    pub fn request_skip_probability(&self, probability: f32) {
        self.request(|requests| requests.skip_probability = Some(probability));
    }

    /// Replaces the whole pattern at the next block boundary.
    pub fn request_snapshot(&self, snapshot: PatternSnapshot) {
        self.request(|requests| {
            requests.snapshot = Some(snapshot);
            requests.snapshot_pending = true;
        });
    }

    fn request(&self, update: impl FnOnce(&mut ClockRequests)) {
        update(&mut self.requests.lock());
        self.requests_pending.store(true, Ordering::Release);
    }

    /// Audio thread: hands pending requests to `apply` without waiting.
    ///
    /// A snapshot is lent rather than moved so its storage is freed on the
    /// control side when the next one replaces it.
    pub(crate) fn take_pending(&self, apply: impl FnOnce(PendingChanges<'_>)) {
        if !self.requests_pending.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(mut requests) = self.requests.try_lock() else {
            self.requests_pending.store(true, Ordering::Release);
            return;
        };
        let snapshot_pending = std::mem::take(&mut requests.snapshot_pending);
        let changes = PendingChanges {
            mode: requests.mode.take(),
            period_ms: requests.period_ms.take(),
            pattern_length: requests.pattern_length.take(),
            skip_probability: requests.skip_probability.take(),
            snapshot: requests.snapshot.as_ref().filter(|_| snapshot_pending),
        };
        apply(changes);
    }

    pub(crate) fn publish(&self, mode: ClockMode, current_step: usize) {
        self.mode.store(mode as u8, Ordering::Relaxed);
        self.current_step.store(current_step, Ordering::Relaxed);
    }

    /// Mode as last reported by the clock.
    pub fn mode(&self) -> ClockMode {
        ClockMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    /// Step the clock will play next, as last reported.
    pub fn current_step(&self) -> usize {
        self.current_step.load(Ordering::Relaxed)
    }
}
