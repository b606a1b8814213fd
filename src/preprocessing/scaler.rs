//! Per-feature standardization fitted incrementally.
//!
//! Rows of each spectrogram are samples and mel bins are features. Statistics
//! are merged batch by batch (Chan et al. pairwise update) so the whole
//! dataset never has to sit in memory at once. Variance is the population
//! variance; features with zero variance are left unscaled.

use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::FeatureError;

/// Incremental mean/variance scaler
#[derive(Debug, Clone, Default, PartialEq, bincode::Encode, bincode::Decode)]
pub struct StandardScaler {
    n_samples_seen: u64,
    mean: Vec<f64>,
    var: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_samples_seen(&self) -> u64 {
        self.n_samples_seen
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn var(&self) -> &[f64] {
        &self.var
    }

    /// Standard deviation per feature, 1.0 where the variance vanishes
    pub fn scale(&self) -> Vec<f64> {
        self.var
            .iter()
            .map(|&v| {
                let s = v.sqrt();
                if s < 10.0 * f64::EPSILON {
                    1.0
                } else {
                    s
                }
            })
            .collect()
    }

    /// Fold the rows of `x` into the running statistics
    pub fn partial_fit(&mut self, x: ArrayView2<f32>) -> Result<(), FeatureError> {
        let (n_rows, n_cols) = x.dim();
        if n_rows == 0 {
            return Ok(());
        }

        if self.n_samples_seen == 0 {
            self.mean = vec![0.0; n_cols];
            self.var = vec![0.0; n_cols];
        } else {
            self.check_features(n_cols)?;
        }

        let x = x.mapv(f64::from);
        let batch_n = n_rows as f64;
        let Some(batch_mean) = x.mean_axis(Axis(0)) else {
            return Ok(());
        };
        let batch_var = x.var_axis(Axis(0), 0.0);

        let seen = self.n_samples_seen as f64;
        let total = seen + batch_n;
        for j in 0..n_cols {
            let delta = batch_mean[j] - self.mean[j];
            let m2 = self.var[j] * seen + batch_var[j] * batch_n + delta * delta * seen * batch_n / total;
            self.mean[j] += delta * batch_n / total;
            self.var[j] = m2 / total;
        }
        self.n_samples_seen += n_rows as u64;
        Ok(())
    }

    /// Center and scale `x` in place with the fitted statistics
    pub fn transform(&self, x: &mut Array2<f32>) -> Result<(), FeatureError> {
        if self.n_samples_seen == 0 {
            return Err(FeatureError::InvalidConfig {
                reason: "scaler has not been fitted".to_string(),
            });
        }
        self.check_features(x.ncols())?;

        let scale = self.scale();
        for mut row in x.rows_mut() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = ((*value as f64 - self.mean[j]) / scale[j]) as f32;
            }
        }
        Ok(())
    }

    /// Persist the scaler as a bincode blob, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), FeatureError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| persistence(path, err))?;
        }
        let encoded = bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|err| persistence(path, err))?;
        fs::write(path, encoded).map_err(|err| persistence(path, err))?;
        tracing::info!("Saved scaler to {}", path.display());
        Ok(())
    }

    /// Load a previously saved scaler
    ///
    /// # Errors
    /// * `ScalerNotFound` - nothing stored at `path`
    /// * `Persistence` - the blob could not be decoded
    pub fn load(path: &Path) -> Result<Self, FeatureError> {
        if !path.exists() {
            return Err(FeatureError::ScalerNotFound {
                path: path.display().to_string(),
            });
        }
        let data = fs::read(path).map_err(|err| persistence(path, err))?;
        let (scaler, _): (StandardScaler, usize) =
            bincode::decode_from_slice(&data, bincode::config::standard())
                .map_err(|err| persistence(path, err))?;
        if scaler.mean.len() != scaler.var.len() {
            return Err(persistence(path, "mean/variance length mismatch"));
        }
        Ok(scaler)
    }

    fn check_features(&self, n_cols: usize) -> Result<(), FeatureError> {
        if n_cols != self.mean.len() {
            return Err(FeatureError::TypeMismatch {
                expected: format!("{} features", self.mean.len()),
                found: format!("{} features", n_cols),
            });
        }
        Ok(())
    }
}

fn persistence(path: &Path, err: impl std::fmt::Display) -> FeatureError {
    FeatureError::Persistence {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
