//! Configuration for the preprocessing pipeline
//!
//! Every stage takes a strongly-typed options struct instead of loose keyword
//! arguments. Structs are (de)serializable so a whole run can be described by
//! one JSON file, and each one validates its own invariants before a stage is
//! allowed to start.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::audio::ChannelMode;
use crate::error::FeatureError;
use crate::preprocessing::spectrogram::WindowFunction;
use crate::sampler::IndexPairing;

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sampler: SamplerConfig,
}

/// Audio loading and flatfielding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Rate every clip is loaded at before flatfielding (Hz)
    pub sample_rate: u32,
    /// Duration every clip is padded or trimmed to (seconds)
    pub target_seconds: f64,
    /// Channel handling when reading raw files
    #[serde(default)]
    pub channel_mode: ChannelMode,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            // MIMII recordings: 16 kHz, 10 s clips
            sample_rate: 16_000,
            target_seconds: 10.0,
            channel_mode: ChannelMode::Mono,
        }
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate must be > 0"));
        }
        if !(self.target_seconds.is_finite() && self.target_seconds > 0.0) {
            return Err(invalid(format!(
                "target_seconds must be a positive number (got {})",
                self.target_seconds
            )));
        }
        Ok(())
    }
}

/// Log-mel spectrogram parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramConfig {
    /// FFT frame size in samples
    pub n_fft: usize,
    /// Stride between frames in samples
    pub hop_length: usize,
    /// Number of mel bands
    pub n_mels: usize,
    /// Exponent of the magnitude spectrum (1.0 = energy, 2.0 = power)
    pub power: f32,
    /// STFT window function
    #[serde(default)]
    pub window: WindowFunction,
    /// Lowest filterbank frequency (Hz)
    #[serde(default)]
    pub f_min: f32,
    /// Highest filterbank frequency (Hz); Nyquist when unset
    #[serde(default)]
    pub f_max: Option<f32>,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            n_fft: 1024,
            hop_length: 512,
            n_mels: 64,
            power: 2.0,
            window: WindowFunction::Hann,
            f_min: 0.0,
            f_max: None,
        }
    }
}

impl SpectrogramConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.n_fft < 2 {
            return Err(invalid(format!("n_fft must be >= 2 (got {})", self.n_fft)));
        }
        if self.hop_length == 0 {
            return Err(invalid("hop_length must be > 0"));
        }
        if self.n_mels == 0 {
            return Err(invalid("n_mels must be > 0"));
        }
        if self.power != 1.0 && self.power != 2.0 {
            return Err(invalid(format!(
                "power must be 1.0 (energy) or 2.0 (power), got {}",
                self.power
            )));
        }
        if self.f_min < 0.0 {
            return Err(invalid("f_min must be >= 0"));
        }
        if let Some(f_max) = self.f_max {
            if f_max <= self.f_min {
                return Err(invalid(format!(
                    "f_max ({}) must be greater than f_min ({})",
                    f_max, self.f_min
                )));
            }
        }
        Ok(())
    }
}

/// Names of the storage directories/files under the storage root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub scaler_dir: String,
    pub scaler_file: String,
    pub feature_dir: String,
    pub feature_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scaler_dir: "scaler".to_string(),
            scaler_file: "scaler.bin".to_string(),
            feature_dir: "specdata".to_string(),
            feature_file: "data.npy".to_string(),
        }
    }
}

/// Batch sampler parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Crops per batch
    pub batch_size: usize,
    /// Time frames per crop
    pub crop_height: usize,
    /// Mel bins per crop (must match the feature array)
    pub crop_width: usize,
    /// Stride between candidate crop starts
    pub hop_size: usize,
    /// Shuffle the index space at construction and after every epoch
    pub shuffle: bool,
    /// How file indices and start offsets are paired
    #[serde(default)]
    pub pairing: IndexPairing,
    /// Seed for reproducible shuffling; entropy-seeded when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            crop_height: 32,
            crop_width: 64,
            hop_size: 8,
            shuffle: true,
            pairing: IndexPairing::Joint,
            seed: None,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be > 0"));
        }
        if self.crop_height == 0 || self.crop_width == 0 {
            return Err(invalid(format!(
                "crop shape must be non-zero (got {}x{})",
                self.crop_height, self.crop_width
            )));
        }
        if self.hop_size == 0 {
            return Err(invalid("hop_size must be > 0"));
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Parse configuration from JSON and validate every section
    pub fn from_json(data: &str) -> Result<Self, FeatureError> {
        let config: PipelineConfig = serde_json::from_str(data)
            .map_err(|err| invalid(format!("failed to parse configuration JSON: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    ///
    /// # Returns
    /// * `Ok(PipelineConfig)` - Loaded and validated configuration
    /// * `Err(FeatureError::InvalidConfig)` - File unreadable or invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FeatureError> {
        let contents = fs::read_to_string(&path).map_err(|err| {
            invalid(format!(
                "failed to read config file {:?}: {}",
                path.as_ref(),
                err
            ))
        })?;
        let config = Self::from_json(&contents)?;
        log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing
    /// or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("[Config] {}. Using defaults.", err);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        self.audio.validate()?;
        self.spectrogram.validate()?;
        self.sampler.validate()?;
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> FeatureError {
    FeatureError::InvalidConfig {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.audio.sample_rate, 16_000);
        assert_eq!(config.spectrogram.n_fft, 1024);
        assert_eq!(config.spectrogram.hop_length, 512);
        assert_eq!(config.spectrogram.n_mels, 64);
        assert_eq!(config.sampler.batch_size, 32);
        assert_eq!(config.sampler.crop_width, config.spectrogram.n_mels);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = PipelineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let json = r#"{ "sampler": { "batch_size": 4, "crop_height": 8, "crop_width": 64, "hop_size": 2, "shuffle": false } }"#;
        let config = PipelineConfig::from_json(json).unwrap();
        assert_eq!(config.sampler.batch_size, 4);
        assert!(!config.sampler.shuffle);
        assert_eq!(config.sampler.pairing, IndexPairing::Joint);
        assert_eq!(config.spectrogram, SpectrogramConfig::default());
    }

    #[test]
    fn test_zero_hop_rejected() {
        let mut config = PipelineConfig::default();
        config.sampler.hop_size = 0;
        assert!(matches!(
            config.validate(),
            Err(FeatureError::InvalidConfig { .. })
        ));

        let mut config = PipelineConfig::default();
        config.spectrogram.hop_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_power_must_be_energy_or_power() {
        for power in [1.0, 2.0] {
            let mut config = PipelineConfig::default();
            config.spectrogram.power = power;
            assert!(config.validate().is_ok(), "power {power} should be accepted");
        }
        for power in [0.3, 1.5, 3.0, -2.0, f32::NAN] {
            let mut config = PipelineConfig::default();
            config.spectrogram.power = power;
            assert!(
                matches!(config.validate(), Err(FeatureError::InvalidConfig { .. })),
                "power {power} should be rejected"
            );
        }
        assert!(PipelineConfig::from_json(r#"{"spectrogram": {"power": 1.5}}"#).is_err());
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = PipelineConfig::load_or_default("/definitely/not/here/config.json");
        assert_eq!(config, PipelineConfig::default());
    }
}
