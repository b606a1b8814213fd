//! Fit/transform pipeline from clips to one stacked feature array.
//!
//! `Fit` learns the scaler over every spectrogram row and stores it.
//! `Transform` reuses a stored scaler, standardizes each spectrogram and writes
//! the stack `(num_files, time_frames, n_mels)` as an f32 `.npy` file.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{stack, Array2, Array3, Axis};
use ndarray_npy::{read_npy, write_npy, ReadNpyError};
use serde::{Deserialize, Serialize};

use super::scaler::StandardScaler;
use super::spectrogram::SpectrogramExtractor;
use crate::config::SpectrogramConfig;
use crate::error::FeatureError;
use crate::storage::StoragePaths;

/// Which half of the scaler lifecycle to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalerMode {
    /// Learn statistics and persist the scaler
    Fit,
    /// Apply a persisted scaler and persist the features
    Transform,
}

pub struct FeaturePipeline {
    extractor: SpectrogramExtractor,
    storage: StoragePaths,
}

impl FeaturePipeline {
    pub fn new(config: SpectrogramConfig, storage: StoragePaths) -> Result<Self, FeatureError> {
        Ok(Self {
            extractor: SpectrogramExtractor::new(config)?,
            storage,
        })
    }

    pub fn storage(&self) -> &StoragePaths {
        &self.storage
    }

    /// Run one mode over `paths`.
    ///
    /// In `Fit` mode the returned array holds the raw (unscaled)
    /// spectrograms and nothing but the scaler is written. In `Transform`
    /// mode it holds the standardized spectrograms that were written to disk.
    ///
    /// # Errors
    /// * `EmptyFileList` - `paths` is empty
    /// * `ScalerNotFound` - `Transform` without a previously fitted scaler
    /// * `ShapeMismatch` - clips produce spectrograms of different shapes
    pub fn run(&mut self, paths: &[PathBuf], mode: ScalerMode) -> Result<Array3<f32>, FeatureError> {
        if paths.is_empty() {
            return Err(FeatureError::EmptyFileList);
        }

        match mode {
            ScalerMode::Fit => self.fit(paths),
            ScalerMode::Transform => self.transform(paths),
        }
    }

    fn fit(&mut self, paths: &[PathBuf]) -> Result<Array3<f32>, FeatureError> {
        tracing::info!("Fitting scaler over {} files", paths.len());
        let mut scaler = StandardScaler::new();
        let mut spectrograms = Vec::with_capacity(paths.len());

        for path in paths {
            let spec = self.extract_checked(path, spectrograms.first())?;
            scaler.partial_fit(spec.view())?;
            spectrograms.push(spec);
        }

        scaler.save(&self.storage.scaler_path)?;
        tracing::info!(
            "Scaler fitted on {} rows x {} bins",
            scaler.n_samples_seen(),
            scaler.n_features()
        );
        stack_spectrograms(&spectrograms)
    }

    fn transform(&mut self, paths: &[PathBuf]) -> Result<Array3<f32>, FeatureError> {
        let scaler = StandardScaler::load(&self.storage.scaler_path)?;
        tracing::info!("Transforming {} files", paths.len());

        let mut spectrograms = Vec::with_capacity(paths.len());
        for path in paths {
            let mut spec = self.extract_checked(path, spectrograms.first())?;
            scaler.transform(&mut spec)?;
            spectrograms.push(spec);
        }

        let features = stack_spectrograms(&spectrograms)?;
        write_features(&self.storage.feature_path, &features)?;
        Ok(features)
    }

    fn extract_checked(
        &mut self,
        path: &Path,
        reference: Option<&Array2<f32>>,
    ) -> Result<Array2<f32>, FeatureError> {
        tracing::debug!("Extracting {}", path.display());
        let spec = self.extractor.extract_file(path)?;
        if let Some(reference) = reference {
            if reference.dim() != spec.dim() {
                return Err(FeatureError::ShapeMismatch {
                    path: path.display().to_string(),
                    expected: reference.dim(),
                    found: spec.dim(),
                });
            }
        }
        Ok(spec)
    }
}

/// Read the stored feature array `(num_files, time_frames, n_mels)`
///
/// # Errors
/// * `FeatureFileNotFound` - features were never written
/// * `TypeMismatch` - the file is not a 3-D f32 array
pub fn read_features(storage: &StoragePaths) -> Result<Array3<f32>, FeatureError> {
    let path = &storage.feature_path;
    if !path.exists() {
        return Err(FeatureError::FeatureFileNotFound {
            path: path.display().to_string(),
        });
    }

    read_npy::<_, Array3<f32>>(path).map_err(|err| match err {
        ReadNpyError::WrongNdim(_, found) => FeatureError::TypeMismatch {
            expected: "3-D array".to_string(),
            found: format!("{}-D array", found),
        },
        ReadNpyError::WrongDescriptor(descr) => FeatureError::TypeMismatch {
            expected: "f32 elements".to_string(),
            found: descr.to_string(),
        },
        other => FeatureError::Persistence {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    })
}

fn write_features(path: &Path, features: &Array3<f32>) -> Result<(), FeatureError> {
    let persistence = |reason: String| FeatureError::Persistence {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| persistence(err.to_string()))?;
    }
    write_npy(path, features).map_err(|err| persistence(err.to_string()))?;
    tracing::info!("Wrote features {:?} to {}", features.dim(), path.display());
    Ok(())
}

fn stack_spectrograms(spectrograms: &[Array2<f32>]) -> Result<Array3<f32>, FeatureError> {
    let views: Vec<_> = spectrograms.iter().map(|s| s.view()).collect();
    stack(Axis(0), &views).map_err(|err| FeatureError::TypeMismatch {
        expected: "spectrograms of equal shape".to_string(),
        found: err.to_string(),
    })
}
