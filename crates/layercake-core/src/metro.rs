//! Sample-counting metronome.

/// Shortest period a [`Metro`] will tick at.
pub const MIN_PERIOD_MS: f64 = 5.0;

const DEFAULT_PERIOD_MS: f64 = 500.0;
const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Raises a tick flag every `period_ms`, counted in samples.
#[derive(Debug, Clone)]
pub struct Metro {
    sample_rate: f64,
    period_ms: f64,
    samples_per_period: u64,
    counter: u64,
    tick_ready: bool,
}

impl Metro {
    pub fn new() -> Self {
        let mut metro = Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            period_ms: DEFAULT_PERIOD_MS,
            samples_per_period: 1,
            counter: 0,
            tick_ready: false,
        };
        metro.update_period();
        metro
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_period();
        self.reset();
    }

    /// Clamped to at least [`MIN_PERIOD_MS`].
    pub fn set_period_ms(&mut self, period_ms: f64) {
        self.period_ms = period_ms.max(MIN_PERIOD_MS);
        self.update_period();
    }

    pub fn period_ms(&self) -> f64 {
        self.period_ms
    }

    pub fn samples_per_period(&self) -> u64 {
        self.samples_per_period
    }

    fn update_period(&mut self) {
        let seconds = (self.period_ms / 1000.0).max(0.001);
        self.samples_per_period = ((seconds * self.sample_rate).round() as u64).max(1);
    }

    /// Restarts the current period and drops any unconsumed tick.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.tick_ready = false;
    }

    #[inline]
    pub fn process_sample(&mut self) {
        self.counter += 1;
        if self.counter >= self.samples_per_period {
            self.counter -= self.samples_per_period;
            self.tick_ready = true;
        }
    }

    /// Returns whether a tick happened since the last call, clearing it.
    #[inline]
    pub fn consume_tick(&mut self) -> bool {
        std::mem::take(&mut self.tick_ready)
    }

    pub fn bpm_to_period_ms(bpm: f64) -> f64 {
        if bpm <= 0.0 {
            0.0
        } else {
            60_000.0 / bpm
        }
    }

    pub fn period_ms_to_bpm(period_ms: f64) -> f64 {
        if period_ms <= 0.0 {
            0.0
        } else {
            60_000.0 / period_ms
        }
    }
}

impl Default for Metro {
    fn default() -> Self {
        Self::new()
    }
}
