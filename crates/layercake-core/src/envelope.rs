//! Attack-release grain envelope.

/// Envelope stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeStage {
    #[default]
    Idle,
    Attack,
    Release,
}

/// Linear attack to full scale, then linear release to silence.
///
/// There is no sustain stage: a grain's envelope runs for
/// `attack_ms + release_ms` and then goes idle.
#[derive(Debug, Clone)]
pub struct Envelope {
    sample_rate: f64,
    attack_ms: f32,
    release_ms: f32,
    attack_step: f32,
    release_step: f32,
    stage: EnvelopeStage,
    value: f32,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        let mut env = Self {
            sample_rate,
            attack_ms: 5.0,
            release_ms: 120.0,
            attack_step: 0.0,
            release_step: 0.0,
            stage: EnvelopeStage::Idle,
            value: 0.0,
        };
        env.recalculate();
        env
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.recalculate();
    }

    /// Negative times are treated as zero.
    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32) {
        self.attack_ms = attack_ms.max(0.0);
        self.release_ms = release_ms.max(0.0);
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.attack_step = step_for(self.attack_ms, self.sample_rate);
        self.release_step = step_for(self.release_ms, self.sample_rate);
    }

    /// Restarts from silence.
    pub fn note_on(&mut self) {
        self.value = 0.0;
        self.stage = if self.attack_step > 0.0 {
            EnvelopeStage::Attack
        } else {
            self.value = 1.0;
            self.after_peak()
        };
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
        self.stage = EnvelopeStage::Idle;
    }

    fn after_peak(&self) -> EnvelopeStage {
        if self.release_step > 0.0 {
            EnvelopeStage::Release
        } else {
            EnvelopeStage::Idle
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeStage::Idle => return 0.0,
            EnvelopeStage::Attack => {
                self.value += self.attack_step;
                if self.value >= 1.0 {
                    self.value = 1.0;
                    self.stage = self.after_peak();
                }
            }
            EnvelopeStage::Release => {
                self.value -= self.release_step;
                if self.value <= 0.0 {
                    self.value = 0.0;
                    self.stage = EnvelopeStage::Idle;
                }
            }
        }
        self.value
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Last value produced.
    pub fn value(&self) -> f32 {
        self.value
    }
}

fn step_for(ms: f32, sample_rate: f64) -> f32 {
    let samples = ms as f64 * 0.001 * sample_rate;
    if samples > 0.0 {
        (1.0 / samples) as f32
    } else {
        0.0
    }
}
