//! Sliding-window patching of a time-frequency representation.
//!
//! Patch `i` covers rows `[i·step, i·step + frame_length)`. Generation stops at
//! the last patch that fits entirely; trailing rows are dropped.

use ndarray::{s, Array2, Array3};

use crate::config::{AudioConfig, TaggingConfig};
use crate::error::PipelineError;

use super::spectrogram::frames_for_seconds;

/// Patch length and step, in spectrogram frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchGeometry {
    /// Rows per patch (n)
    pub frame_length: usize,
    /// Rows between successive patch starts (o)
    pub step: usize,
}

impl PatchGeometry {
    /// Validate and build a geometry. Requires `0 < step <= frame_length`.
    pub fn new(frame_length: usize, step: usize) -> Result<Self, PipelineError> {
        if frame_length == 0 {
            return Err(PipelineError::InvalidBatching(
                "frame length must be > 0".to_string(),
            ));
        }
        if step == 0 || step > frame_length {
            return Err(PipelineError::InvalidBatching(format!(
                "step {step} must be in 1..={frame_length}"
            )));
        }
        Ok(Self { frame_length, step })
    }

    /// Derive the geometry from patch length/overlap in seconds.
    ///
    /// With no overlap configured, patches are laid back to back.
    pub fn from_config(audio: &AudioConfig, tagging: &TaggingConfig) -> Result<Self, PipelineError> {
        let frame_length = frames_for_seconds(tagging.input_length, audio) + 1;
        let step = match tagging.input_overlap {
            Some(overlap) => frames_for_seconds(overlap, audio),
            None => frame_length,
        };
        Self::new(frame_length, step)
    }

    /// Number of full patches that fit in `rows` frames.
    pub fn patch_count(&self, rows: usize) -> usize {
        if rows < self.frame_length {
            0
        } else {
            (rows - self.frame_length) / self.step + 1
        }
    }
}

/// Slices spectrograms into overlapping fixed-length patches.
pub struct SpectrogramBatcher {
    geometry: PatchGeometry,
}

impl SpectrogramBatcher {
    /// Create a batcher for the given geometry.
    pub fn new(geometry: PatchGeometry) -> Self {
        Self { geometry }
    }

    /// The patch geometry in use.
    pub fn geometry(&self) -> PatchGeometry {
        self.geometry
    }

    /// Split a (T × F) representation into a (patches × n × F) array.
    ///
    /// Fails with `InsufficientAudioLength` when `T < n`.
    pub fn batch(&self, rep: &Array2<f32>) -> Result<Array3<f32>, PipelineError> {
        let (rows, cols) = rep.dim();
        let n = self.geometry.frame_length;
        let count = self.geometry.patch_count(rows);
        if count == 0 {
            return Err(PipelineError::InsufficientAudioLength {
                frames: rows,
                frame_length: n,
            });
        }

        let mut patches = Array3::<f32>::zeros((count, n, cols));
        for i in 0..count {
            let start = i * self.geometry.step;
            patches
                .slice_mut(s![i, .., ..])
                .assign(&rep.slice(s![start..start + n, ..]));
        }

        let dropped = rows - ((count - 1) * self.geometry.step + n);
        tracing::trace!(
            "Batched {} frames into {} patches of {} (step {}, {} trailing frames dropped)",
            rows,
            count,
            n,
            self.geometry.step,
            dropped
        );
        Ok(patches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * 10 + c) as f32)
    }

    #[test]
    fn test_patch_count_formula() {
        for t in 1..40usize {
            for n in 1..=t {
                for o in 1..=n {
                    let g = PatchGeometry::new(n, o).unwrap();
                    assert_eq!(g.patch_count(t), (t - n) / o + 1, "T={t} n={n} o={o}");
                }
            }
        }
    }

    #[test]
    fn test_patch_spans_rows() {
        let rep = ramp(10, 3);
        let batcher = SpectrogramBatcher::new(PatchGeometry::new(4, 3).unwrap());
        let patches = batcher.batch(&rep).unwrap();
        // (10 - 4) / 3 + 1 = 3 patches starting at rows 0, 3, 6.
        assert_eq!(patches.dim(), (3, 4, 3));
        for i in 0..3 {
            for r in 0..4 {
                for c in 0..3 {
                    assert_eq!(patches[[i, r, c]], rep[[i * 3 + r, c]]);
                }
            }
        }
    }

    #[test]
    fn test_trailing_rows_dropped() {
        let rep = ramp(11, 2);
        let batcher = SpectrogramBatcher::new(PatchGeometry::new(5, 5).unwrap());
        let patches = batcher.batch(&rep).unwrap();
        // Rows 10.. never appear.
        assert_eq!(patches.dim().0, 2);
        assert_eq!(patches[[1, 4, 0]], rep[[9, 0]]);
    }

    #[test]
    fn test_exact_fit_single_patch() {
        let rep = ramp(5, 2);
        let batcher = SpectrogramBatcher::new(PatchGeometry::new(5, 2).unwrap());
        assert_eq!(batcher.batch(&rep).unwrap().dim(), (1, 5, 2));
    }

    #[test]
    fn test_too_short_is_error() {
        let rep = ramp(4, 2);
        let batcher = SpectrogramBatcher::new(PatchGeometry::new(5, 5).unwrap());
        let err = batcher.batch(&rep).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientAudioLength {
                frames: 4,
                frame_length: 5
            }
        ));
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(PatchGeometry::new(0, 1).is_err());
        assert!(PatchGeometry::new(4, 0).is_err());
        assert!(PatchGeometry::new(4, 5).is_err());
    }

    #[test]
    fn test_geometry_from_default_config() {
        let g = PatchGeometry::from_config(&AudioConfig::default(), &TaggingConfig::default())
            .unwrap();
        assert_eq!(g, PatchGeometry { frame_length: 187, step: 187 });

        let tagging = TaggingConfig {
            input_overlap: Some(1.0),
            ..TaggingConfig::default()
        };
        let g = PatchGeometry::from_config(&AudioConfig::default(), &tagging).unwrap();
        assert_eq!(g.step, 61);
    }
}
