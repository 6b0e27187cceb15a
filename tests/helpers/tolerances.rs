//! Tolerance constants for engine output tests.

/// Exact paths: integer-position reads, unity gain.
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Interpolated reads and accumulated envelope steps.
pub const DSP_EPSILON: f32 = 1e-4;

/// Values below this are considered silent (~-80dB).
pub const SILENCE_THRESHOLD: f32 = 0.0001;
