//! Audio decoding to mono PCM at the model sample rate.
//!
//! Any container/codec symphonia can probe is accepted; the first audio track
//! is decoded in full, downmixed by channel averaging and resampled with a
//! sinc interpolator when the native rate differs from the target.

use std::path::Path;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::AudioConfig;
use crate::error::PipelineError;

/// Decodes audio files into mono sample buffers.
pub struct AudioDecoder {
    target_rate: u32,
}

/// Result of decoding a track.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1, 1] at `sample_rate`
    pub samples: Vec<f32>,
    /// Sample rate of `samples`
    pub sample_rate: u32,
    /// Sample rate of the source file
    pub native_rate: u32,
    /// Channel count of the source file
    pub channels: usize,
}

impl DecodedAudio {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

impl AudioDecoder {
    /// Create a decoder that resamples to `config.sample_rate`.
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            target_rate: config.sample_rate,
        }
    }

    /// Decode a whole file to mono samples at the target rate.
    pub fn decode(&self, path: &Path) -> Result<DecodedAudio, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }
        let decode_err = |message: String| PipelineError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let file = std::fs::File::open(path).map_err(|e| decode_err(format!("Cannot open file: {e}")))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_err(format!("Failed to probe format: {e}")))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| decode_err("No audio track found".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let native_rate = codec_params
            .sample_rate
            .ok_or_else(|| decode_err("Sample rate not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| decode_err(format!("Failed to create decoder: {e}")))?;

        let mut mono = Vec::new();
        let mut channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(decode_err(format!("Failed to read packet: {e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping corrupt packet in {:?}: {}", path, e);
                    continue;
                }
                Err(e) => return Err(decode_err(format!("Decode failed: {e}"))),
            };

            let spec = *decoded.spec();
            let packet_channels = spec.channels.count().max(1);
            channels = packet_channels;

            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);
            downmix_into(buf.samples(), packet_channels, &mut mono);
        }

        tracing::trace!(
            "Decoded {:?}: {} frames @ {} Hz, {} channel(s)",
            path,
            mono.len(),
            native_rate,
            channels
        );

        let samples = if native_rate != self.target_rate {
            resample(mono, native_rate, self.target_rate).map_err(decode_err)?
        } else {
            mono
        };

        Ok(DecodedAudio {
            samples,
            sample_rate: self.target_rate,
            native_rate,
            channels,
        })
    }
}

/// Average interleaved frames into mono, appending to `out`.
pub(crate) fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.reserve(interleaved.len() / channels);
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Resample a mono buffer in a single pass.
fn resample(samples: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>, String> {
    if samples.is_empty() {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to as f64 / from as f64;
    let frames = samples.len();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, 1)
        .map_err(|e| format!("Failed to create resampler: {e}"))?;
    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| format!("Resampling failed: {e}"))?;

    tracing::trace!(
        "Resampled {} frames ({} Hz) -> {} frames ({} Hz)",
        frames,
        from,
        output[0].len(),
        to
    );
    Ok(output.swap_remove(0))
}
