// Sampler module - fixed-size training crops from the stored feature array
//
// The feature array (num_files, time_frames, n_mels) is loaded once and shared
// read-only. Each sample is a (file, start) pair; a crop covers frames
// [start, start + crop_height) of that file and every mel bin. Candidate starts
// are 0, hop, 2*hop, ... below time_frames - crop_height + hop. The last one may
// overshoot; it is clamped to time_frames - crop_height when the crop is cut, so
// the tail of every spectrogram is still sampled and no crop runs past its end.
//
// Lifecycle:
//   new/from_storage -> index space built and (optionally) shuffled
//   get/iter         -> batches of the current epoch
//   on_epoch_end     -> reshuffle the same index space

use std::sync::Arc;

use ndarray::{s, Array3, Array4, ArrayView3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::SamplerConfig;
use crate::error::FeatureError;
use crate::preprocessing::read_features;
use crate::storage::StoragePaths;

/// How file indices and start offsets are combined into samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPairing {
    /// Every (file, start) combination exactly once, shuffled as pairs
    #[default]
    Joint,
    /// Files repeated per start and starts repeated per file, each sequence
    /// shuffled on its own. Coverage of the combinations is not guaranteed.
    Independent,
}

/// One batch for a reconstruction objective: targets are the inputs
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingBatch {
    /// (batch_size, crop_height, crop_width, 1)
    pub inputs: Array4<f32>,
    pub targets: Array4<f32>,
}

pub struct BatchSampler {
    features: Arc<Array3<f32>>,
    config: SamplerConfig,
    num_starts_per_file: usize,
    file_indices: Vec<usize>,
    start_offsets: Vec<usize>,
    rng: StdRng,
}

impl BatchSampler {
    /// Load the stored feature array and build a sampler over it
    ///
    /// # Errors
    /// * `FeatureFileNotFound` - features have not been extracted yet
    pub fn from_storage(storage: &StoragePaths, config: SamplerConfig) -> Result<Self, FeatureError> {
        let features = read_features(storage)?;
        tracing::info!(
            "Loaded features {:?} from {}",
            features.dim(),
            storage.feature_path.display()
        );
        Self::new(Arc::new(features), config)
    }

    /// Build a sampler over an already loaded feature array
    ///
    /// # Errors
    /// * `InvalidConfig` - zero batch size, crop size or hop
    /// * `InvalidCropShape` - crops are taller than the spectrograms
    /// * `TypeMismatch` - crop width differs from the number of mel bins
    /// * `EmptyFileList` - the array holds no files
    pub fn new(features: Arc<Array3<f32>>, config: SamplerConfig) -> Result<Self, FeatureError> {
        config.validate()?;

        let (num_files, time_frames, n_mels) = features.dim();
        if num_files == 0 {
            return Err(FeatureError::EmptyFileList);
        }
        if config.crop_height > time_frames {
            return Err(FeatureError::InvalidCropShape {
                crop_height: config.crop_height,
                time_frames,
            });
        }
        if config.crop_width != n_mels {
            return Err(FeatureError::TypeMismatch {
                expected: format!("crop width {}", n_mels),
                found: format!("crop width {}", config.crop_width),
            });
        }

        let num_starts_per_file =
            (time_frames - config.crop_height + config.hop_size).div_ceil(config.hop_size);
        let (file_indices, start_offsets) =
            build_index_space(num_files, num_starts_per_file, config.hop_size, config.pairing);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut sampler = Self {
            features,
            config,
            num_starts_per_file,
            file_indices,
            start_offsets,
            rng,
        };
        sampler.shuffle();

        tracing::info!(
            "Sampler ready: {} files x {} starts, {} batches of {}",
            num_files,
            num_starts_per_file,
            sampler.len(),
            sampler.config.batch_size
        );
        Ok(sampler)
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn num_files(&self) -> usize {
        self.features.dim().0
    }

    pub fn time_frames(&self) -> usize {
        self.features.dim().1
    }

    pub fn num_starts_per_file(&self) -> usize {
        self.num_starts_per_file
    }

    /// Number of complete batches per epoch; leftover samples are dropped
    pub fn len(&self) -> usize {
        self.file_indices.len() / self.config.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current (file, start) order, before clamping
    pub fn sampling_order(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.file_indices
            .iter()
            .copied()
            .zip(self.start_offsets.iter().copied())
    }

    /// Batch `index` of the current epoch
    pub fn get(&self, index: usize) -> Result<TrainingBatch, FeatureError> {
        let total = self.len();
        if index >= total {
            return Err(FeatureError::BatchOutOfRange { index, total });
        }
        Ok(self.batch_at(index))
    }

    /// Every batch of the current epoch in order
    pub fn iter(&self) -> impl Iterator<Item = TrainingBatch> + '_ {
        (0..self.len()).map(move |index| self.batch_at(index))
    }

    /// Reshuffle the index space for the next epoch
    pub fn on_epoch_end(&mut self) {
        self.shuffle();
    }

    fn shuffle(&mut self) {
        if !self.config.shuffle {
            return;
        }
        match self.config.pairing {
            IndexPairing::Joint => {
                let mut order: Vec<usize> = (0..self.file_indices.len()).collect();
                order.shuffle(&mut self.rng);
                self.file_indices = order.iter().map(|&i| self.file_indices[i]).collect();
                self.start_offsets = order.iter().map(|&i| self.start_offsets[i]).collect();
            }
            IndexPairing::Independent => {
                self.file_indices.shuffle(&mut self.rng);
                self.start_offsets.shuffle(&mut self.rng);
            }
        }
    }

    fn batch_at(&self, index: usize) -> TrainingBatch {
        let batch_size = self.config.batch_size;
        let crop_height = self.config.crop_height;
        let last_start = self.time_frames() - crop_height;
        let range = index * batch_size..(index + 1) * batch_size;

        let features: ArrayView3<f32> = self.features.view();
        let mut inputs = Array4::<f32>::zeros((batch_size, crop_height, self.config.crop_width, 1));
        for (slot, (&file, &start)) in self.file_indices[range.clone()]
            .iter()
            .zip(&self.start_offsets[range])
            .enumerate()
        {
            let start = start.min(last_start);
            inputs
                .slice_mut(s![slot, .., .., 0])
                .assign(&features.slice(s![file, start..start + crop_height, ..]));
        }

        TrainingBatch {
            targets: inputs.clone(),
            inputs,
        }
    }
}

fn build_index_space(
    num_files: usize,
    num_starts: usize,
    hop_size: usize,
    pairing: IndexPairing,
) -> (Vec<usize>, Vec<usize>) {
    match pairing {
        IndexPairing::Joint => (0..num_files)
            .flat_map(|file| (0..num_starts).map(move |k| (file, k * hop_size)))
            .unzip(),
        IndexPairing::Independent => {
            let files = (0..num_files)
                .flat_map(|file| std::iter::repeat(file).take(num_starts))
                .collect();
            let starts = (0..num_starts)
                .flat_map(|k| std::iter::repeat(k * hop_size).take(num_files))
                .collect();
            (files, starts)
        }
    }
}
