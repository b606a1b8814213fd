//! On-disk locations of the fitted scaler and the extracted feature array.
//!
//! Both live under a storage root two levels above the input files, i.e.
//! `{base}/{machine}/{id}` for inputs in `{base}/{machine}/{id}/{condition}`.
//! Paths are derived once and passed around instead of being recomputed.

use std::path::{Path, PathBuf};

use crate::config::StorageConfig;
use crate::error::FeatureError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub root: PathBuf,
    pub scaler_path: PathBuf,
    pub feature_path: PathBuf,
}

impl StoragePaths {
    /// Lay out the storage files under an explicit root
    pub fn under(root: impl Into<PathBuf>, config: &StorageConfig) -> Self {
        let root = root.into();
        Self {
            scaler_path: root.join(&config.scaler_dir).join(&config.scaler_file),
            feature_path: root.join(&config.feature_dir).join(&config.feature_file),
            root,
        }
    }

    /// Derive the storage root from the first input file
    ///
    /// # Errors
    /// * `EmptyFileList` - `paths` is empty
    pub fn from_file_list(paths: &[PathBuf], config: &StorageConfig) -> Result<Self, FeatureError> {
        let first = paths.first().ok_or(FeatureError::EmptyFileList)?;
        Ok(Self::under(storage_root(first), config))
    }
}

fn storage_root(file: &Path) -> PathBuf {
    file.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_two_levels_up() {
        let files = vec![PathBuf::from("/data/fan/id_00/normal/00000001.wav")];
        let paths = StoragePaths::from_file_list(&files, &StorageConfig::default()).unwrap();

        assert_eq!(paths.root, PathBuf::from("/data/fan/id_00"));
        assert_eq!(paths.scaler_path, PathBuf::from("/data/fan/id_00/scaler/scaler.bin"));
        assert_eq!(paths.feature_path, PathBuf::from("/data/fan/id_00/specdata/data.npy"));
    }

    #[test]
    fn test_custom_layout() {
        let config = StorageConfig {
            scaler_dir: "fitted".to_string(),
            scaler_file: "std.bin".to_string(),
            feature_dir: "features".to_string(),
            feature_file: "train.npy".to_string(),
        };
        let paths = StoragePaths::under("/tmp/store", &config);
        assert_eq!(paths.scaler_path, PathBuf::from("/tmp/store/fitted/std.bin"));
        assert_eq!(paths.feature_path, PathBuf::from("/tmp/store/features/train.npy"));
    }

    #[test]
    fn test_empty_file_list() {
        assert!(matches!(
            StoragePaths::from_file_list(&[], &StorageConfig::default()),
            Err(FeatureError::EmptyFileList)
        ));
    }
}
