//! File discovery for the `{base}/{machine}/{id}/{condition}[/{extradir}]`
//! dataset layout.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::{load_resampled, WAV_EXTENSION};
use crate::error::AudioError;

/// Selects one machine/id/condition directory of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileQuery {
    /// Machine type, e.g. `fan`
    pub machine: String,
    /// Machine id, e.g. `id_00`
    pub id: String,
    /// Condition label, e.g. `normal` or `abnormal`
    pub condition: String,
    /// Optional subdirectory under the condition, e.g. `flatfield`
    #[serde(default)]
    pub extradir: Option<String>,
}

impl FileQuery {
    pub fn new(machine: impl Into<String>, id: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            id: id.into(),
            condition: condition.into(),
            extradir: None,
        }
    }

    pub fn with_extradir(mut self, extradir: impl Into<String>) -> Self {
        self.extradir = Some(extradir.into());
        self
    }

    /// Directory this query resolves to under `base`
    pub fn directory(&self, base: &Path) -> PathBuf {
        let dir = base.join(&self.machine).join(&self.id).join(&self.condition);
        match &self.extradir {
            Some(extra) => dir.join(extra),
            None => dir,
        }
    }
}

/// List all `.wav` files of the selected directory, sorted by path.
///
/// # Errors
/// * `DirectoryNotFound` - the composed directory does not exist
pub fn locate_wav_files(base: &Path, query: &FileQuery) -> Result<Vec<PathBuf>, AudioError> {
    let dir = query.directory(base);
    if !dir.is_dir() {
        return Err(AudioError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if has_wav_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    tracing::info!("Found {} wav files under {}", files.len(), dir.display());
    Ok(files)
}

/// Load every file at `sample_rate` and collect the distinct frame counts.
///
/// A single entry means the collection is already flat.
pub fn check_data_shape(paths: &[PathBuf], sample_rate: u32) -> Result<BTreeSet<usize>, AudioError> {
    tracing::info!("Total number of wav files: {}", paths.len());

    let mut shapes = BTreeSet::new();
    for path in paths {
        let waveform = load_resampled(path, sample_rate)?;
        shapes.insert(waveform.frames());
    }

    tracing::info!("The wav files consist of the following lengths={:?}", shapes);
    Ok(shapes)
}

pub(crate) fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(WAV_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{write_audio, Waveform};
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_is_reported() {
        let dir = tempdir().unwrap();
        let query = FileQuery::new("fan", "id_00", "normal");

        match locate_wav_files(dir.path(), &query) {
            Err(AudioError::DirectoryNotFound { path }) => {
                assert!(path.ends_with("normal"));
            }
            other => panic!("Expected DirectoryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_only_wav_files_sorted() {
        let dir = tempdir().unwrap();
        let query = FileQuery::new("fan", "id_00", "normal");
        let data_dir = query.directory(dir.path());
        fs::create_dir_all(data_dir.join("nested")).unwrap();
        fs::write(data_dir.join("b.wav"), b"").unwrap();
        fs::write(data_dir.join("a.wav"), b"").unwrap();
        fs::write(data_dir.join("notes.txt"), b"").unwrap();

        let files = locate_wav_files(dir.path(), &query).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.wav", "b.wav"]);
    }

    #[test]
    fn test_extradir_is_appended() {
        let query = FileQuery::new("pump", "id_02", "abnormal").with_extradir("flatfield");
        assert_eq!(
            query.directory(Path::new("/data")),
            PathBuf::from("/data/pump/id_02/abnormal/flatfield")
        );
    }

    #[test]
    fn test_check_data_shape_collects_distinct_lengths() {
        let dir = tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, len) in [("a.wav", 100), ("b.wav", 100), ("c.wav", 80)] {
            let path = dir.path().join(name);
            write_audio(&path, &Waveform::mono(vec![0.0; len], 8_000)).unwrap();
            paths.push(path);
        }

        let shapes = check_data_shape(&paths, 8_000).unwrap();
        assert_eq!(shapes.into_iter().collect::<Vec<_>>(), vec![80, 100]);
    }
}
