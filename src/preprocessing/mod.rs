// Preprocessing - offline transformation of raw clips into training features
//
// Module organization:
// - flatfield: pad/trim every clip to one fixed duration
// - spectrogram: STFT -> mel filterbank -> dB, time-major
// - scaler: incremental per-mel-bin standardization
// - features: fit/transform pipeline and feature-array persistence

pub mod features;
pub mod flatfield;
pub mod scaler;
pub mod spectrogram;

pub use features::{read_features, FeaturePipeline, ScalerMode};
pub use flatfield::{flatfield_audio, pad_audio, trim_audio, FlatfieldAction, FlatfieldReport};
pub use scaler::StandardScaler;
pub use spectrogram::{SpectrogramExtractor, WindowFunction};
