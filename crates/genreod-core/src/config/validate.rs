//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{Config, AUDIO_FORMATS};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::ValidationError(
                "audio.sample_rate must be > 0".into(),
            ));
        }
        if self.audio.n_fft < 2 {
            return Err(ConfigError::ValidationError(
                "audio.n_fft must be >= 2".into(),
            ));
        }
        if self.audio.hop_length == 0 {
            return Err(ConfigError::ValidationError(
                "audio.hop_length must be > 0".into(),
            ));
        }
        if self.audio.n_mels == 0 {
            return Err(ConfigError::ValidationError(
                "audio.n_mels must be > 0".into(),
            ));
        }
        if self.tagging.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "tagging.batch_size must be > 0".into(),
            ));
        }
        if !(self.tagging.input_length > 0.0) {
            return Err(ConfigError::ValidationError(
                "tagging.input_length must be > 0".into(),
            ));
        }
        if let Some(overlap) = self.tagging.input_overlap {
            if !(overlap > 0.0 && overlap <= self.tagging.input_length) {
                return Err(ConfigError::ValidationError(
                    "tagging.input_overlap must be in (0, input_length]".into(),
                ));
            }
        }
        if self.library.supported_formats.is_empty() {
            return Err(ConfigError::ValidationError(
                "library.supported_formats must not be empty".into(),
            ));
        }
        if let Some(format) = self
            .library
            .supported_formats
            .iter()
            .find(|f| !AUDIO_FORMATS.contains(&f.to_lowercase().as_str()))
        {
            return Err(ConfigError::ValidationError(format!(
                "library.supported_formats: {format:?} is not one of {}",
                AUDIO_FORMATS.join(", ")
            )));
        }
        let contamination = self.detection.default_contamination;
        if !(contamination > 0.0 && contamination <= 0.5) {
            return Err(ConfigError::ValidationError(
                "detection.default_contamination must be in (0, 0.5]".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_hop() {
        let mut config = Config::default();
        config.audio.hop_length = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("hop_length"));
    }

    #[test]
    fn test_validate_rejects_overlap_longer_than_patch() {
        let mut config = Config::default();
        config.tagging.input_overlap = Some(4.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("input_overlap"));

        config.tagging.input_overlap = Some(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_invalid_contamination() {
        let mut config = Config::default();
        config.detection.default_contamination = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_contamination"));

        config.detection.default_contamination = 0.7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_formats() {
        let mut config = Config::default();
        config.library.supported_formats.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("supported_formats"));
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let mut config = Config::default();
        config.library.supported_formats = vec!["mp3".into(), "ogg".into()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("\"ogg\""));

        config.library.supported_formats = vec!["FLAC".into(), "wav".into()];
        assert!(config.validate().is_ok());
    }
}
