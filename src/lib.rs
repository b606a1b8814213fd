// Machine Sound Prep - offline preprocessing for machine-sound anomaly detection
// Locate clips, flatfield their duration, extract log-mel spectrograms,
// standardize them and serve fixed-size crops to a training loop.

// Module declarations
pub mod audio;
pub mod config;
pub mod error;
pub mod locator;
pub mod preprocessing;
pub mod sampler;
pub mod storage;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use error::{AudioError, ErrorCode, FeatureError};
pub use locator::{check_data_shape, locate_wav_files, FileQuery};
pub use preprocessing::{
    flatfield_audio, read_features, FeaturePipeline, ScalerMode, SpectrogramExtractor,
    StandardScaler,
};
pub use sampler::{BatchSampler, IndexPairing, TrainingBatch};
pub use storage::StoragePaths;

/// Install a `tracing` fmt subscriber on stderr filtered by `RUST_LOG`
/// (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        tracing::info!("logging initialised twice without panicking");
    }
}
