//! WAV reading and writing.
//!
//! Integer PCM is scaled to `[-1.0, 1.0)` by its bit depth; float WAV data is
//! passed through untouched. Output is always written as 32-bit float so that
//! flatfielded clips keep their samples bit-exact.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::resample::resample_mono;
use crate::error::AudioError;

/// File extension of every audio file the pipeline reads.
pub const WAV_EXTENSION: &str = "wav";

/// Channel handling when reading a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Average all channels into one
    #[default]
    Mono,
    /// Keep the file's channel layout (interleaved)
    Stereo,
}

/// Decoded audio: interleaved samples plus their layout
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl Waveform {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            samples,
        }
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Average interleaved channels into a single channel
    pub fn into_mono(self) -> Self {
        if self.channels <= 1 {
            return self;
        }
        let channels = self.channels as usize;
        let samples = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        Self {
            sample_rate: self.sample_rate,
            channels: 1,
            samples,
        }
    }
}

/// Read a WAV file at its native sample rate.
///
/// # Errors
/// * `FileNotFound` - `path` does not exist
/// * `DecodeFailed` - header or sample data could not be decoded
pub fn read_audio(path: &Path, mode: ChannelMode) -> Result<Waveform, AudioError> {
    if !path.exists() {
        return Err(AudioError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let mut reader = hound::WavReader::open(path).map_err(|err| decode_error(path, err))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::DecodeFailed {
            path: path.display().to_string(),
            reason: "zero channels".to_string(),
        });
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| decode_error(path, err)))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / 128.0)
                        .map_err(|err| decode_error(path, err))
                })
                .collect::<Result<Vec<f32>, _>>()?,
            16 => reader
                .samples::<i16>()
                .map(|sample| {
                    sample
                        .map(|v| v as f32 / 32_768.0)
                        .map_err(|err| decode_error(path, err))
                })
                .collect::<Result<Vec<f32>, _>>()?,
            bits @ (24 | 32) => {
                let scale = (1u64 << (bits - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|v| v as f32 / scale)
                            .map_err(|err| decode_error(path, err))
                    })
                    .collect::<Result<Vec<f32>, _>>()?
            }
            bits => {
                return Err(AudioError::DecodeFailed {
                    path: path.display().to_string(),
                    reason: format!("unsupported bits_per_sample={}", bits),
                })
            }
        },
    };

    let waveform = Waveform {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    };

    Ok(match mode {
        ChannelMode::Mono => waveform.into_mono(),
        ChannelMode::Stereo => waveform,
    })
}

/// Read a WAV file as mono and resample it to `target_rate`.
pub fn load_resampled(path: &Path, target_rate: u32) -> Result<Waveform, AudioError> {
    let waveform = read_audio(path, ChannelMode::Mono)?;
    if waveform.sample_rate == target_rate {
        return Ok(waveform);
    }

    tracing::debug!(
        "Resampling {} from {} Hz to {} Hz",
        path.display(),
        waveform.sample_rate,
        target_rate
    );
    let samples = resample_mono(&waveform.samples, waveform.sample_rate, target_rate)?;
    Ok(Waveform::mono(samples, target_rate))
}

/// Write a waveform as a 32-bit float WAV file.
pub fn write_audio(path: &Path, waveform: &Waveform) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: waveform.channels,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|err| write_error(path, err))?;
    for &sample in &waveform.samples {
        writer
            .write_sample(sample)
            .map_err(|err| write_error(path, err))?;
    }
    writer.finalize().map_err(|err| write_error(path, err))
}

fn decode_error(path: &Path, err: hound::Error) -> AudioError {
    AudioError::DecodeFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn write_error(path: &Path, err: hound::Error) -> AudioError {
    AudioError::WriteFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_i16_stereo(path: &Path, frames: &[(i16, i16)], sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &(l, r) in frames {
            writer.write_sample(l).unwrap();
            writer.write_sample(r).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_file_reports_file_not_found() {
        let err = read_audio(Path::new("/no/such/clip.wav"), ChannelMode::Mono).unwrap_err();
        assert!(matches!(err, AudioError::FileNotFound { .. }));
    }

    #[test]
    fn test_float_roundtrip_is_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let waveform = Waveform::mono(vec![0.0, 0.25, -0.5, 0.125], 16_000);

        write_audio(&path, &waveform).unwrap();
        let loaded = read_audio(&path, ChannelMode::Mono).unwrap();

        assert_eq!(loaded, waveform);
    }

    #[test]
    fn test_stereo_mode_keeps_channels_and_mono_averages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_i16_stereo(&path, &[(16_384, 0), (-16_384, -16_384)], 8_000);

        let stereo = read_audio(&path, ChannelMode::Stereo).unwrap();
        assert_eq!(stereo.channels, 2);
        assert_eq!(stereo.frames(), 2);
        assert_eq!(stereo.samples, vec![0.5, 0.0, -0.5, -0.5]);

        let mono = read_audio(&path, ChannelMode::Mono).unwrap();
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_load_resampled_passthrough_at_native_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let waveform = Waveform::mono(vec![0.1; 160], 16_000);
        write_audio(&path, &waveform).unwrap();

        let loaded = load_resampled(&path, 16_000).unwrap();
        assert_eq!(loaded.samples.len(), 160);
        assert_eq!(loaded.sample_rate, 16_000);
    }

    #[test]
    fn test_duration_seconds() {
        let waveform = Waveform {
            sample_rate: 4,
            channels: 2,
            samples: vec![0.0; 16],
        };
        assert_eq!(waveform.frames(), 8);
        assert!((waveform.duration_seconds() - 2.0).abs() < 1e-12);
    }
}
