//! Low frequency oscillator with seeded random shapes.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const MIN_RATE_HZ: f32 = 0.01;
pub const MAX_RATE_HZ: f32 = 20.0;
pub const MAX_CLOCK_DIVISION: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LfoShape {
    #[default]
    Sine,
    Triangle,
    Square,
    /// Sample-and-hold: one random value per cycle.
    Random,
    /// Random values per cycle, linearly joined.
    SmoothRandom,
}

impl LfoShape {
    /// Periodic shapes at `phase` in `[0, 1)`, in `[-1, 1]`.
    ///
    /// `width` skews the triangle peak and sets the square duty cycle.
    /// Random shapes evaluate to zero here; the generator supplies them.
    #[inline]
    pub fn evaluate(&self, phase: f32, width: f32) -> f32 {
        match self {
            LfoShape::Sine => (phase * std::f32::consts::TAU).sin(),
            LfoShape::Triangle => {
                if phase < width {
                    -1.0 + 2.0 * phase / width
                } else {
                    1.0 - 2.0 * (phase - width) / (1.0 - width)
                }
            }
            LfoShape::Square => {
                if phase < width {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoShape::Random | LfoShape::SmoothRandom => 0.0,
        }
    }

    pub fn is_random(&self) -> bool {
        matches!(self, LfoShape::Random | LfoShape::SmoothRandom)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LfoShape::Sine => "Sine",
            LfoShape::Triangle => "Triangle",
            LfoShape::Square => "Square",
            LfoShape::Random => "Random",
            LfoShape::SmoothRandom => "Random (Smooth)",
        }
    }
}

/// Everything that defines an LFO's output, minus its running phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfoSettings {
    pub shape: LfoShape,
    /// Cycles per second when not clocked.
    pub rate_hz: f32,
    /// Cycles per beat. Zero runs free at `rate_hz`.
    pub clock_division: f32,
    /// Output scale, 0..1.
    pub level: f32,
    /// Triangle peak position / square duty cycle.
    pub width: f32,
    /// Added to the phase, in cycles.
    pub phase_offset: f32,
    /// Output spans `[-level, level]` instead of `[0, level]`.
    pub bipolar: bool,
    pub seed: u64,
}

impl Default for LfoSettings {
    fn default() -> Self {
        Self {
            shape: LfoShape::Sine,
            rate_hz: 1.0,
            clock_division: 0.0,
            level: 1.0,
            width: 0.5,
            phase_offset: 0.0,
            bipolar: true,
            seed: 0x1A7E_CA4E,
        }
    }
}

impl LfoSettings {
    /// Clamps every field to its usable range.
    pub fn sanitized(mut self) -> Self {
        self.rate_hz = finite_or(self.rate_hz, 1.0).clamp(MIN_RATE_HZ, MAX_RATE_HZ);
        self.clock_division = finite_or(self.clock_division, 0.0).clamp(0.0, MAX_CLOCK_DIVISION);
        self.level = finite_or(self.level, 1.0).clamp(0.0, 1.0);
        self.width = finite_or(self.width, 0.5).clamp(0.01, 0.99);
        self.phase_offset = finite_or(self.phase_offset, 0.0).rem_euclid(1.0);
        self
    }

    pub fn is_clocked(&self) -> bool {
        self.clock_division > 0.0
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Random value for `cycle`, a pure function of `seed` and `cycle`, so a
/// clocked random LFO repeats exactly whenever the beat position does.
fn cycle_value(seed: u64, cycle: i64) -> f32 {
    let mixed = seed ^ (cycle as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    SmallRng::seed_from_u64(mixed).gen_range(-1.0..=1.0)
}

/// A single LFO.
#[derive(Debug, Clone)]
pub struct LfoGenerator {
    settings: LfoSettings,
    /// Free-running position in cycles.
    cycles: f64,
    cycle: Option<i64>,
    held: f32,
    next: f32,
    value: f32,
}

impl LfoGenerator {
    pub fn new(settings: LfoSettings) -> Self {
        Self {
            settings: settings.sanitized(),
            cycles: 0.0,
            cycle: None,
            held: 0.0,
            next: 0.0,
            value: 0.0,
        }
    }

    pub fn settings(&self) -> &LfoSettings {
        &self.settings
    }

    /// Replaces the settings, keeping the running phase.
    pub fn apply_settings(&mut self, settings: LfoSettings) {
        let settings = settings.sanitized();
        if settings.seed != self.settings.seed {
            self.cycle = None;
        }
        self.settings = settings;
    }

    pub fn reset(&mut self) {
        self.cycles = 0.0;
        self.cycle = None;
        self.value = 0.0;
    }

    /// Last output.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Evaluates at an absolute beat position using `clock_division`.
    pub fn advance_clocked(&mut self, beat: f64) -> f32 {
        let position = beat * self.settings.clock_division as f64;
        self.render(position)
    }

    /// Advances the free-running phase by `seconds` at `rate_hz`.
    pub fn process_delta(&mut self, seconds: f64) -> f32 {
        self.cycles += self.settings.rate_hz as f64 * seconds;
        self.render(self.cycles)
    }

    /// Clocked when a clock division is set, free-running otherwise.
    #[inline]
    pub fn tick(&mut self, beat: f64, seconds: f64) -> f32 {
        if self.settings.is_clocked() {
            self.advance_clocked(beat)
        } else {
            self.process_delta(seconds)
        }
    }

    fn render(&mut self, position: f64) -> f32 {
        let position = position + self.settings.phase_offset as f64;
        let floor = position.floor();
        let phase = (position - floor) as f32;
        self.enter_cycle(floor as i64);

        let raw = match self.settings.shape {
            LfoShape::Random => self.held,
            LfoShape::SmoothRandom => self.held + (self.next - self.held) * phase,
            shape => shape.evaluate(phase, self.settings.width),
        };
        self.value = if self.settings.bipolar {
            raw * self.settings.level
        } else {
            (raw * 0.5 + 0.5) * self.settings.level
        };
        self.value
    }

    fn enter_cycle(&mut self, cycle: i64) {
        if self.cycle == Some(cycle) || !self.settings.shape.is_random() {
            return;
        }
        let seed = self.settings.seed;
        self.held = match self.cycle {
            Some(previous) if previous + 1 == cycle => self.next,
            _ => cycle_value(seed, cycle),
        };
        self.next = cycle_value(seed, cycle + 1);
        self.cycle = Some(cycle);
    }
}

impl Default for LfoGenerator {
    fn default() -> Self {
        Self::new(LfoSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clocked(shape: LfoShape) -> LfoGenerator {
        LfoGenerator::new(LfoSettings {
            shape,
            clock_division: 1.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_clocked_sine_follows_beat() {
        let mut lfo = clocked(LfoShape::Sine);
        assert_relative_eq!(lfo.advance_clocked(0.25), 1.0, epsilon = 1e-5);
        assert_relative_eq!(lfo.advance_clocked(3.75), -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_triangle_width_moves_peak() {
        assert_relative_eq!(LfoShape::Triangle.evaluate(0.0, 0.5), -1.0);
        assert_relative_eq!(LfoShape::Triangle.evaluate(0.5, 0.5), 1.0);
        assert_relative_eq!(LfoShape::Triangle.evaluate(0.25, 0.25), 1.0);
    }

    #[test]
    fn test_square_duty_cycle() {
        assert_eq!(LfoShape::Square.evaluate(0.2, 0.25), 1.0);
        assert_eq!(LfoShape::Square.evaluate(0.3, 0.25), -1.0);
    }

    #[test]
    fn test_unipolar_level() {
        let mut lfo = LfoGenerator::new(LfoSettings {
            shape: LfoShape::Square,
            clock_division: 1.0,
            level: 0.5,
            bipolar: false,
            ..Default::default()
        });
        assert_relative_eq!(lfo.advance_clocked(0.1), 0.5);
        assert_relative_eq!(lfo.advance_clocked(0.9), 0.0);
    }

    #[test]
    fn test_clocked_random_repeats_with_beat() {
        let mut lfo = clocked(LfoShape::Random);
        let first: Vec<f32> = (0..8).map(|b| lfo.advance_clocked(b as f64 + 0.5)).collect();
        let again: Vec<f32> = (0..8).map(|b| lfo.advance_clocked(b as f64 + 0.5)).collect();
        assert_eq!(first, again);
        assert!(first.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(first.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_smooth_random_joins_cycles() {
        let mut lfo = clocked(LfoShape::SmoothRandom);
        let end_of_first = lfo.advance_clocked(0.9999);
        let start_of_second = lfo.advance_clocked(1.0);
        assert!((end_of_first - start_of_second).abs() < 0.01);
    }

    #[test]
    fn test_free_running_rate() {
        let mut lfo = LfoGenerator::new(LfoSettings {
            shape: LfoShape::Square,
            rate_hz: 2.0,
            ..Default::default()
        });
        // 0.1 s at 2 Hz is phase 0.2: first half of the cycle.
        assert_eq!(lfo.process_delta(0.1), 1.0);
        // 0.35 s total is phase 0.7.
        assert_eq!(lfo.process_delta(0.25), -1.0);
    }

    #[test]
    fn test_apply_settings_keeps_phase() {
        let mut lfo = LfoGenerator::new(LfoSettings {
            rate_hz: 1.0,
            ..Default::default()
        });
        lfo.process_delta(0.25);
        lfo.apply_settings(LfoSettings {
            shape: LfoShape::Square,
            ..Default::default()
        });
        // Phase continues from 0.25, still within the high half.
        assert_eq!(lfo.process_delta(0.0), 1.0);
    }

    #[test]
    fn test_sanitized_ranges() {
        let settings = LfoSettings {
            rate_hz: 100.0,
            level: -1.0,
            phase_offset: 1.25,
            width: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.rate_hz, MAX_RATE_HZ);
        assert_eq!(settings.level, 0.0);
        assert_relative_eq!(settings.phase_offset, 0.25);
        assert_eq!(settings.width, 0.5);
    }
}
