//! Flatfielding: normalize every clip to one fixed duration.
//!
//! Short clips get zeros prepended, long clips lose their tail. The output
//! directory is wiped and recreated on every run, so re-running is
//! idempotent by replacement rather than incremental.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::{load_resampled, write_audio, Waveform};
use crate::error::AudioError;
use crate::locator::has_wav_extension;

/// Name of the directory flatfielded clips are written to.
pub const FLATFIELD_DIR: &str = "flatfield";

/// What flatfielding did to one clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatfieldAction {
    Padded { frames_added: usize },
    Trimmed { frames_removed: usize },
    Unchanged,
}

/// Summary of a flatfielding run
#[derive(Debug, Clone, Default)]
pub struct FlatfieldReport {
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub padded: usize,
    pub trimmed: usize,
    pub unchanged: usize,
}

/// Number of frames `target_seconds` spans at `sample_rate`.
pub fn target_frames(target_seconds: f64, sample_rate: u32) -> usize {
    (target_seconds * sample_rate as f64) as usize
}

/// Prepend zeros until the waveform spans `target_seconds`.
///
/// Waveforms that are already long enough are returned unchanged.
pub fn pad_audio(waveform: Waveform, target_seconds: f64) -> Waveform {
    let target = target_frames(target_seconds, waveform.sample_rate);
    let frames = waveform.frames();
    if frames >= target {
        tracing::debug!("Padding not required");
        return waveform;
    }

    let n_pad = target - frames;
    tracing::debug!(
        "Adding {} secs of zero-padding",
        n_pad as f64 / waveform.sample_rate as f64
    );

    let channels = waveform.channels.max(1) as usize;
    let mut samples = vec![0.0f32; n_pad * channels];
    samples.extend_from_slice(&waveform.samples);
    Waveform { samples, ..waveform }
}

/// Cut the end of the waveform so it spans `target_seconds`.
///
/// Waveforms that are not longer than the target are returned unchanged.
pub fn trim_audio(mut waveform: Waveform, target_seconds: f64) -> Waveform {
    let target = target_frames(target_seconds, waveform.sample_rate);
    let frames = waveform.frames();
    if frames <= target {
        tracing::debug!("Trimming not required");
        return waveform;
    }

    tracing::debug!(
        "Trimming {} secs of sample",
        (frames - target) as f64 / waveform.sample_rate as f64
    );
    let channels = waveform.channels.max(1) as usize;
    waveform.samples.truncate(target * channels);
    waveform
}

/// Pad or trim a single waveform, reporting which of the two applied.
pub fn flatfield_waveform(waveform: Waveform, target_seconds: f64) -> (Waveform, FlatfieldAction) {
    let target = target_frames(target_seconds, waveform.sample_rate);
    let frames = waveform.frames();

    if target > frames {
        (
            pad_audio(waveform, target_seconds),
            FlatfieldAction::Padded {
                frames_added: target - frames,
            },
        )
    } else if target < frames {
        (
            trim_audio(waveform, target_seconds),
            FlatfieldAction::Trimmed {
                frames_removed: frames - target,
            },
        )
    } else {
        (waveform, FlatfieldAction::Unchanged)
    }
}

/// Flatfield every `.wav` file in `paths`.
///
/// Files are loaded as mono at `sample_rate` and written to
/// `{dir of first path}/flatfield/{file name}`. An existing output directory
/// is removed first.
pub fn flatfield_audio(
    paths: &[PathBuf],
    target_seconds: f64,
    sample_rate: u32,
) -> Result<FlatfieldReport, AudioError> {
    let first = paths.first().ok_or(AudioError::EmptyFileList)?;
    let sound_dir = first.parent().unwrap_or_else(|| Path::new("."));
    let output_dir = sound_dir.join(FLATFIELD_DIR);

    recreate_dir(&output_dir)?;

    let mut report = FlatfieldReport {
        output_dir: output_dir.clone(),
        ..Default::default()
    };

    for path in paths.iter().filter(|p| has_wav_extension(p)) {
        let Some(file_name) = path.file_name() else {
            continue;
        };
        tracing::info!("File: {}", path.display());

        let waveform = load_resampled(path, sample_rate)?;
        let (flat, action) = flatfield_waveform(waveform, target_seconds);
        match action {
            FlatfieldAction::Padded { .. } => report.padded += 1,
            FlatfieldAction::Trimmed { .. } => report.trimmed += 1,
            FlatfieldAction::Unchanged => {
                tracing::debug!("Zero padding or trimming not required");
                report.unchanged += 1;
            }
        }

        let out_path = output_dir.join(file_name);
        write_audio(&out_path, &flat)?;
        report.written.push(out_path);
    }

    tracing::info!(
        "Flatfielded {} files into {} (padded={}, trimmed={}, unchanged={})",
        report.written.len(),
        output_dir.display(),
        report.padded,
        report.trimmed,
        report.unchanged
    );
    Ok(report)
}

fn recreate_dir(dir: &Path) -> Result<(), AudioError> {
    if dir.exists() {
        tracing::info!("Path exists. Removing and adding {}", dir.display());
        fs::remove_dir_all(dir)?;
    } else {
        tracing::info!("Path does not exist. Creating {}", dir.display());
    }
    fs::create_dir_all(dir)?;
    Ok(())
}
