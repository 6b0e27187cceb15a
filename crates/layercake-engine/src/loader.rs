//! Decoding audio files into layer-ready mono samples.

use std::path::Path;

use crate::Result;
#[cfg(feature = "wav")]
use crate::Error;

/// Mono audio decoded from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before mix-down.
    pub channels: u16,
}

/// Reads an audio file and mixes it down to mono.
pub trait AudioFileReader {
    fn read_mono(&self, path: &Path) -> Result<DecodedAudio>;
}

/// Reads PCM and float WAV files through `hound`.
#[cfg(feature = "wav")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WavFileReader;

#[cfg(feature = "wav")]
impl AudioFileReader for WavFileReader {
    fn read_mono(&self, path: &Path) -> Result<DecodedAudio> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(Error::UnsupportedFormat(format!(
                        "{} bits per sample",
                        spec.bits_per_sample
                    )));
                }
                let max = (1_i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(DecodedAudio {
            samples: mix_to_mono(&interleaved, spec.channels as usize),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}

/// Averages interleaved frames down to one channel.
pub fn mix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let scale = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect()
}

/// Linear-interpolation resampling from `from_rate` to `to_rate`.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor().max(1.0) as usize;
    let last = samples.len() - 1;
    (0..out_len)
        .map(|i| {
            let position = i as f64 * ratio;
            let index = (position as usize).min(last);
            let frac = (position - index as f64) as f32;
            let next = samples[(index + 1).min(last)];
            samples[index] + (next - samples[index]) * frac
        })
        .collect()
}

/// Scales `samples` so the loudest one reaches full scale.
pub fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()));
    if peak > 0.0 && peak.is_finite() {
        let gain = 1.0 / peak;
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }
}
