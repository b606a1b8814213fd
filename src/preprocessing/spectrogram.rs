// Spectrogram module - log-mel spectrogram extraction
//
// Algorithm:
// 1. Reflect-pad the signal by n_fft / 2 on both sides (centered frames)
// 2. Window each frame and take |FFT|^power for the positive frequencies
// 3. Project onto a Slaney-style mel filterbank (area normalized)
// 4. Convert to dB relative to the spectrogram's own maximum, floored at -80 dB
//
// Output is time-major: rows are frames, columns are mel bands. Because every
// clip is referenced to its own peak, absolute loudness is not comparable
// across clips after this step.

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use std::sync::Arc;

use crate::audio::{read_audio, ChannelMode};
use crate::config::SpectrogramConfig;
use crate::error::FeatureError;

/// Floor applied before taking logarithms
const AMIN: f32 = 1e-10;

/// Dynamic range kept below the peak (dB)
const TOP_DB: f32 = 80.0;

/// STFT window function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    #[serde(alias = "hanning")]
    Hann,
    Hamming,
    Blackman,
    #[serde(alias = "boxcar", alias = "ones")]
    Rectangular,
}

impl WindowFunction {
    /// Periodic window of length `size` (suited for spectral analysis)
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        let n = size as f64;
        (0..size)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / n;
                let w = match self {
                    WindowFunction::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowFunction::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowFunction::Blackman => {
                        0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
                    }
                    WindowFunction::Rectangular => 1.0,
                };
                w as f32
            })
            .collect()
    }
}

/// Mel filterbank weights for one sample rate
struct MelFilterbank {
    sample_rate: u32,
    /// [n_mels][n_fft / 2 + 1]
    weights: Vec<Vec<f32>>,
}

/// Computes log-mel spectrograms with a fixed configuration
pub struct SpectrogramExtractor {
    config: SpectrogramConfig,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    filterbank: Option<MelFilterbank>,
}

impl SpectrogramExtractor {
    /// Create an extractor, validating the configuration first
    pub fn new(config: SpectrogramConfig) -> Result<Self, FeatureError> {
        config.validate()?;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.n_fft);
        let window = config.window.coefficients(config.n_fft);

        Ok(Self {
            config,
            fft,
            window,
            filterbank: None,
        })
    }

    pub fn config(&self) -> &SpectrogramConfig {
        &self.config
    }

    /// Number of frames produced for a signal of `n_samples`
    pub fn output_frames(&self, n_samples: usize) -> usize {
        let n_fft = self.config.n_fft;
        let padded_len = n_samples + 2 * (n_fft / 2);
        1 + padded_len.saturating_sub(n_fft) / self.config.hop_length
    }

    /// Load a file as mono at its native rate and compute its spectrogram
    pub fn extract_file(&mut self, path: &Path) -> Result<Array2<f32>, FeatureError> {
        let waveform = read_audio(path, ChannelMode::Mono)?;
        self.compute(&waveform.samples, waveform.sample_rate)
    }

    /// Compute the log-mel spectrogram, shape `(frames, n_mels)`
    pub fn compute(&mut self, samples: &[f32], sample_rate: u32) -> Result<Array2<f32>, FeatureError> {
        if sample_rate == 0 {
            return Err(FeatureError::InvalidConfig {
                reason: "sample rate must be > 0".to_string(),
            });
        }
        if samples.is_empty() {
            return Err(FeatureError::InvalidConfig {
                reason: "cannot compute a spectrogram of an empty waveform".to_string(),
            });
        }

        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let n_mels = self.config.n_mels;
        let n_bins = n_fft / 2 + 1;
        let power = self.config.power;

        let n_frames = self.output_frames(samples.len());
        let padded = reflect_pad(samples, n_fft / 2);
        let weights = filterbank_for(&mut self.filterbank, &self.config, sample_rate);

        let mut mel_spec = Array2::<f32>::zeros((n_frames, n_mels));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
        let mut spectrum = vec![0.0f32; n_bins];

        for frame in 0..n_frames {
            let start = frame * hop;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }

            self.fft.process(&mut buffer);

            for (bin, value) in spectrum.iter_mut().enumerate() {
                let magnitude = buffer[bin].norm();
                *value = if power == 2.0 {
                    magnitude * magnitude
                } else {
                    magnitude.powf(power)
                };
            }

            for (mel_idx, filter) in weights.iter().enumerate() {
                let energy: f32 = filter.iter().zip(&spectrum).map(|(w, s)| w * s).sum();
                mel_spec[[frame, mel_idx]] = energy;
            }
        }

        power_to_db(&mut mel_spec);
        Ok(mel_spec)
    }
}

/// Filterbank for `sample_rate`, rebuilt only when the rate changes
fn filterbank_for<'a>(
    slot: &'a mut Option<MelFilterbank>,
    config: &SpectrogramConfig,
    sample_rate: u32,
) -> &'a [Vec<f32>] {
    if !matches!(slot, Some(bank) if bank.sample_rate == sample_rate) {
        *slot = None;
    }
    let bank = slot.get_or_insert_with(|| {
        let f_max = config.f_max.unwrap_or(sample_rate as f32 / 2.0);
        MelFilterbank {
            sample_rate,
            weights: mel_filterbank(sample_rate, config.n_fft, config.n_mels, config.f_min, f_max),
        }
    });
    &bank.weights
}

/// Convert a power spectrogram to dB relative to its maximum, in place
fn power_to_db(spec: &mut Array2<f32>) {
    let reference = spec.iter().cloned().fold(0.0f32, f32::max);
    let ref_db = 10.0 * reference.max(AMIN).log10();

    spec.mapv_inplace(|s| 10.0 * s.max(AMIN).log10() - ref_db);

    let peak = spec.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - TOP_DB;
    spec.mapv_inplace(|s| s.max(floor));
}

/// Mirror the signal around its edges (edge sample not repeated)
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let len = samples.len();
    if len == 1 {
        return vec![samples[0]; len + 2 * pad];
    }

    let period = 2 * (len - 1) as i64;
    (0..len + 2 * pad)
        .map(|i| {
            let mut idx = (i as i64 - pad as i64).rem_euclid(period);
            if idx >= len as i64 {
                idx = period - idx;
            }
            samples[idx as usize]
        })
        .collect()
}

fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;

    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        F_SP * mel
    }
}

/// Edge and center frequencies of `n_mels` bands (`n_mels + 2` points)
fn mel_band_edges(n_mels: usize, f_min: f32, f_max: f32) -> Vec<f64> {
    let mel_min = hz_to_mel(f_min as f64);
    let mel_max = hz_to_mel(f_max as f64);
    (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect()
}

/// Center frequency of every mel band
pub fn mel_center_frequencies(n_mels: usize, f_min: f32, f_max: f32) -> Vec<f32> {
    let edges = mel_band_edges(n_mels, f_min, f_max);
    edges[1..=n_mels].iter().map(|&hz| hz as f32).collect()
}

/// Triangular mel filters, each scaled to unit area in Hz
fn mel_filterbank(
    sample_rate: u32,
    n_fft: usize,
    n_mels: usize,
    f_min: f32,
    f_max: f32,
) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect();
    let edges = mel_band_edges(n_mels, f_min, f_max);

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let enorm = 2.0 / (right - left);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (center - left);
                    let upper = (right - f) / (right - center);
                    (lower.min(upper).max(0.0) * enorm) as f32
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, n_samples: usize) -> Vec<f32> {
        (0..n_samples)
            .map(|i| (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_output_shape_is_time_major() {
        let mut extractor = SpectrogramExtractor::new(SpectrogramConfig::default()).unwrap();
        let samples = sine(440.0, 16_000, 16_000);

        let spec = extractor.compute(&samples, 16_000).unwrap();
        // 1 + 16000 / 512 = 32 frames
        assert_eq!(spec.dim(), (32, 64));
        assert_eq!(extractor.output_frames(16_000), 32);
    }

    #[test]
    fn test_peak_is_zero_db_and_floor_is_top_db() {
        let mut extractor = SpectrogramExtractor::new(SpectrogramConfig::default()).unwrap();
        let samples = sine(1000.0, 16_000, 8_000);

        let spec = extractor.compute(&samples, 16_000).unwrap();
        let max = spec.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min = spec.iter().cloned().fold(f32::INFINITY, f32::min);
        assert_eq!(max, 0.0);
        assert!(min >= -TOP_DB - 1e-3);
    }

    #[test]
    fn test_sine_energy_lands_in_matching_band() {
        let config = SpectrogramConfig::default();
        let mut extractor = SpectrogramExtractor::new(config.clone()).unwrap();
        let samples = sine(1000.0, 16_000, 16_000);

        let spec = extractor.compute(&samples, 16_000).unwrap();
        let middle = spec.row(spec.nrows() / 2);
        let (argmax, _) = middle
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, &v)| if v > best.1 { (i, v) } else { best });

        let centers = mel_center_frequencies(config.n_mels, 0.0, 8_000.0);
        assert!(
            (centers[argmax] - 1000.0).abs() < 100.0,
            "peak band center {} Hz",
            centers[argmax]
        );
    }

    #[test]
    fn test_silence_is_flat() {
        let mut extractor = SpectrogramExtractor::new(SpectrogramConfig::default()).unwrap();
        let spec = extractor.compute(&vec![0.0; 4096], 16_000).unwrap();
        assert!(spec.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reflect_pad_matches_numpy_reflect() {
        let padded = reflect_pad(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [0.0, 440.0, 1000.0, 4000.0, 8000.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn test_window_shapes() {
        let hann = WindowFunction::Hann.coefficients(8);
        assert_eq!(hann[0], 0.0);
        assert!((hann[4] - 1.0).abs() < 1e-6);
        assert!(WindowFunction::Rectangular
            .coefficients(4)
            .iter()
            .all(|&w| w == 1.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SpectrogramConfig {
            hop_length: 0,
            ..SpectrogramConfig::default()
        };
        assert!(matches!(
            SpectrogramExtractor::new(config),
            Err(FeatureError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_window_alias_deserializes() {
        let window: WindowFunction = serde_json::from_str("\"hanning\"").unwrap();
        assert_eq!(window, WindowFunction::Hann);
        let window: WindowFunction = serde_json::from_str("\"boxcar\"").unwrap();
        assert_eq!(window, WindowFunction::Rectangular);
    }
}
