// Feature error types and constants

use crate::error::{AudioError, ErrorCode};
use log::error;
use std::fmt;

/// Feature error code constants
///
/// Error code range: 2001-2010
pub struct FeatureErrorCodes {}

impl FeatureErrorCodes {
    /// Transform requested before a scaler was fitted
    pub const SCALER_NOT_FOUND: i32 = 2001;

    /// Batch sampling requested before features were extracted
    pub const FEATURE_FILE_NOT_FOUND: i32 = 2002;

    /// Stored data or argument has the wrong type/dimensionality
    pub const TYPE_MISMATCH: i32 = 2003;

    /// Spectrograms in one collection disagree in shape
    pub const SHAPE_MISMATCH: i32 = 2004;

    /// Crop does not fit inside the spectrogram time axis
    pub const INVALID_CROP_SHAPE: i32 = 2005;

    /// Configuration value outside its valid range
    pub const INVALID_CONFIG: i32 = 2006;

    /// Batch index past the end of the epoch
    pub const BATCH_OUT_OF_RANGE: i32 = 2007;

    /// Operation received no input files
    pub const EMPTY_FILE_LIST: i32 = 2008;

    /// Scaler or feature array could not be written/read
    pub const PERSISTENCE: i32 = 2009;

    /// Underlying audio failure
    pub const AUDIO: i32 = 2010;
}

/// Log a feature error with structured context
pub fn log_feature_error(err: &FeatureError, context: &str) {
    error!(
        "Feature error in {}: code={}, component=FeaturePipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Feature-related errors
///
/// These errors cover spectrogram extraction, scaler fitting/persistence,
/// feature storage and batch sampling.
///
/// Error code ranges: 2001-2010
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// No persisted scaler at the expected path
    ScalerNotFound { path: String },

    /// No persisted feature array at the expected path
    FeatureFileNotFound { path: String },

    /// Wrong dimensionality or element type
    TypeMismatch { expected: String, found: String },

    /// A spectrogram disagrees with the first one in the collection
    ShapeMismatch {
        path: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Crop height larger than the available time frames
    InvalidCropShape {
        crop_height: usize,
        time_frames: usize,
    },

    /// Configuration value rejected during validation
    InvalidConfig { reason: String },

    /// Requested batch index past the end of the epoch
    BatchOutOfRange { index: usize, total: usize },

    /// No input files were given
    EmptyFileList,

    /// Encoding/decoding or filesystem failure while persisting data
    Persistence { path: String, reason: String },

    /// Audio loading failed underneath feature extraction
    Audio(AudioError),
}

impl ErrorCode for FeatureError {
    fn code(&self) -> i32 {
        match self {
            FeatureError::ScalerNotFound { .. } => FeatureErrorCodes::SCALER_NOT_FOUND,
            FeatureError::FeatureFileNotFound { .. } => FeatureErrorCodes::FEATURE_FILE_NOT_FOUND,
            FeatureError::TypeMismatch { .. } => FeatureErrorCodes::TYPE_MISMATCH,
            FeatureError::ShapeMismatch { .. } => FeatureErrorCodes::SHAPE_MISMATCH,
            FeatureError::InvalidCropShape { .. } => FeatureErrorCodes::INVALID_CROP_SHAPE,
            FeatureError::InvalidConfig { .. } => FeatureErrorCodes::INVALID_CONFIG,
            FeatureError::BatchOutOfRange { .. } => FeatureErrorCodes::BATCH_OUT_OF_RANGE,
            FeatureError::EmptyFileList => FeatureErrorCodes::EMPTY_FILE_LIST,
            FeatureError::Persistence { .. } => FeatureErrorCodes::PERSISTENCE,
            FeatureError::Audio(_) => FeatureErrorCodes::AUDIO,
        }
    }

    fn message(&self) -> String {
        match self {
            FeatureError::ScalerNotFound { path } => format!(
                "Path to scaler not found: {}. Fit the scaler first and rerun.",
                path
            ),
            FeatureError::FeatureFileNotFound { path } => {
                format!("No feature file at {}. Extract features first.", path)
            }
            FeatureError::TypeMismatch { expected, found } => {
                format!("Type mismatch: expected {}, found {}", expected, found)
            }
            FeatureError::ShapeMismatch {
                path,
                expected,
                found,
            } => format!(
                "Spectrogram of {} has shape {:?}, expected {:?}",
                path, found, expected
            ),
            FeatureError::InvalidCropShape {
                crop_height,
                time_frames,
            } => format!(
                "Crop height {} exceeds the {} available time frames",
                crop_height, time_frames
            ),
            FeatureError::InvalidConfig { reason } => format!("Invalid configuration: {}", reason),
            FeatureError::BatchOutOfRange { index, total } => {
                format!("Batch index {} out of range (epoch has {} batches)", index, total)
            }
            FeatureError::EmptyFileList => "No audio files were provided".to_string(),
            FeatureError::Persistence { path, reason } => {
                format!("Failed to persist {}: {}", path, reason)
            }
            FeatureError::Audio(err) => err.message(),
        }
    }
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FeatureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FeatureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeatureError::Audio(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AudioError> for FeatureError {
    fn from(err: AudioError) -> Self {
        FeatureError::Audio(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_error_codes() {
        assert_eq!(
            FeatureError::ScalerNotFound {
                path: "s".to_string()
            }
            .code(),
            2001
        );
        assert_eq!(
            FeatureError::FeatureFileNotFound {
                path: "d".to_string()
            }
            .code(),
            2002
        );
        assert_eq!(
            FeatureError::TypeMismatch {
                expected: "3-D".to_string(),
                found: "2-D".to_string()
            }
            .code(),
            2003
        );
        assert_eq!(
            FeatureError::InvalidCropShape {
                crop_height: 40,
                time_frames: 20
            }
            .code(),
            2005
        );
        assert_eq!(
            FeatureError::BatchOutOfRange { index: 6, total: 6 }.code(),
            2007
        );
        assert_eq!(FeatureError::EmptyFileList.code(), 2008);
        assert_eq!(FeatureError::Audio(AudioError::EmptyFileList).code(), 2010);
    }

    #[test]
    fn test_feature_error_display() {
        let err = FeatureError::InvalidCropShape {
            crop_height: 40,
            time_frames: 20,
        };
        assert!(err.message().contains("40"));
        assert!(err.message().contains("20"));

        let err = FeatureError::ScalerNotFound {
            path: "/data/fan/scaler/scaler.bin".to_string(),
        };
        assert!(err.to_string().contains("code 2001"));
    }

    #[test]
    fn test_audio_error_is_source() {
        use std::error::Error;

        let err = FeatureError::from(AudioError::FileNotFound {
            path: "x.wav".to_string(),
        });
        assert!(err.source().is_some());
        assert!(err.message().contains("x.wav"));
    }
}
