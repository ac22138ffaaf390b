//! Mel power spectrogram and log compression.
//!
//! The representation fed to the tagging model is a centered STFT (reflect
//! padding, periodic Hann window), squared magnitude, projected on a
//! Slaney-style area-normalized mel filterbank, then log-compressed with
//! `log10(10000·x + 1)` after a round trip through half precision.

use std::sync::Arc;

use half::f16;
use ndarray::Array2;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::config::AudioConfig;
use crate::error::PipelineError;

/// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert a frequency in Hz to the Slaney mel scale.
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert a Slaney mel value back to Hz.
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n_mels + 2` band edge frequencies evenly spaced on the mel scale.
pub fn mel_frequencies(n_mels: usize, f_min: f64, f_max: f64) -> Vec<f64> {
    let (lo, hi) = (hz_to_mel(f_min), hz_to_mel(f_max));
    let count = n_mels + 2;
    (0..count)
        .map(|i| mel_to_hz(lo + (hi - lo) * i as f64 / (count - 1) as f64))
        .collect()
}

/// Build an (n_mels × n_fft/2+1) triangular filterbank with Slaney normalization.
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f32> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * nyquist / (n_bins - 1) as f64)
        .collect();
    let edges = mel_frequencies(n_mels, 0.0, nyquist);

    let mut weights = Array2::<f32>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
        let enorm = 2.0 / (right - left);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            let w = lower.min(upper).max(0.0);
            weights[[m, k]] = (w * enorm) as f32;
        }
    }
    weights
}

/// Periodic Hann window of length `n`.
fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}

/// Pad `pad` samples on both sides by reflection (zeros when the signal is too short).
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len() + 2 * pad);
    if samples.len() <= pad {
        out.resize(pad, 0.0);
        out.extend_from_slice(samples);
        out.resize(samples.len() + 2 * pad, 0.0);
        return out;
    }
    out.extend((1..=pad).rev().map(|i| samples[i]));
    out.extend_from_slice(samples);
    let last = samples.len() - 1;
    out.extend((1..=pad).map(|i| samples[last - i]));
    out
}

/// Computes mel power spectrograms for one audio configuration.
pub struct MelSpectrogram {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    filterbank: Array2<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl MelSpectrogram {
    /// Plan the FFT and build the filterbank for the given configuration.
    pub fn new(config: &AudioConfig) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(config.n_fft);
        Self {
            n_fft: config.n_fft,
            hop_length: config.hop_length,
            window: hann_window(config.n_fft),
            filterbank: mel_filterbank(config.sample_rate, config.n_fft, config.n_mels),
            fft,
        }
    }

    /// Number of mel bands (columns of the output).
    pub fn n_mels(&self) -> usize {
        self.filterbank.nrows()
    }

    /// Compute the (frames × n_mels) mel power spectrogram of mono samples.
    pub fn compute(&self, samples: &[f32]) -> Result<Array2<f32>, PipelineError> {
        if samples.is_empty() {
            return Err(PipelineError::Spectrogram {
                message: "Empty audio data".to_string(),
            });
        }

        let padded = reflect_pad(samples, self.n_fft / 2);
        let n_frames = 1 + (padded.len() - self.n_fft) / self.hop_length;
        let n_bins = self.n_fft / 2 + 1;

        let mut power = Array2::<f32>::zeros((n_frames, n_bins));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        for t in 0..n_frames {
            let start = t * self.hop_length;
            let frame = &padded[start..start + self.n_fft];
            for ((slot, &x), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(x * w, 0.0);
            }
            self.fft.process(&mut buffer);
            for (k, c) in buffer.iter().take(n_bins).enumerate() {
                power[[t, k]] = c.norm_sqr();
            }
        }

        Ok(power.dot(&self.filterbank.t()))
    }
}

/// Log-compress a spectrogram in place: `log10(10000·x + 1)` in half precision.
///
/// The input is rounded to f16 before the logarithm, and every intermediate
/// and the result are rounded to f16 as well. Values past the f16 range
/// saturate to infinity.
pub fn log_compress(rep: &mut Array2<f32>) {
    let round = |v: f32| f16::from_f32(v).to_f32();
    rep.mapv_inplace(|x| {
        let scaled = round(10000.0 * round(x));
        round(round(scaled + 1.0).log10())
    });
}

/// Convert a duration to a frame count the way the patch geometry expects:
/// `floor((seconds·sr − n_fft/2) / hop)`, clamped at zero.
pub fn frames_for_seconds(seconds: f32, config: &AudioConfig) -> usize {
    let samples = (seconds as f64 * config.sample_rate as f64).floor() as i64;
    let offset = (config.n_fft / 2) as i64;
    let frames = (samples - offset).div_euclid(config.hop_length as i64);
    frames.max(0) as usize
}
