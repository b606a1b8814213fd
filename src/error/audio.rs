// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes returned by
/// [`AudioError::code`]. The CLI reports these alongside the message.
///
/// Error code range: 1001-1007
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Audio file does not exist
    pub const FILE_NOT_FOUND: i32 = 1001;

    /// Expected data directory does not exist
    pub const DIRECTORY_NOT_FOUND: i32 = 1002;

    /// WAV data could not be decoded
    pub const DECODE_FAILED: i32 = 1003;

    /// WAV data could not be written
    pub const WRITE_FAILED: i32 = 1004;

    /// Resampler construction or processing failed
    pub const RESAMPLE_FAILED: i32 = 1005;

    /// Operation received no input files
    pub const EMPTY_FILE_LIST: i32 = 1006;

    /// Filesystem error outside of WAV decoding/encoding
    pub const IO: i32 = 1007;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioIo, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover file discovery, WAV decoding/encoding, resampling
/// and the flatfielding output directory.
///
/// Error code ranges: 1001-1007
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Audio file does not exist
    FileNotFound { path: String },

    /// Directory composed from the machine/id/condition layout does not exist
    DirectoryNotFound { path: String },

    /// WAV header or sample data could not be decoded
    DecodeFailed { path: String, reason: String },

    /// WAV output could not be written
    WriteFailed { path: String, reason: String },

    /// Resampling to the requested rate failed
    ResampleFailed { reason: String },

    /// No input files were given
    EmptyFileList,

    /// Generic filesystem failure
    Io { details: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::FileNotFound { .. } => AudioErrorCodes::FILE_NOT_FOUND,
            AudioError::DirectoryNotFound { .. } => AudioErrorCodes::DIRECTORY_NOT_FOUND,
            AudioError::DecodeFailed { .. } => AudioErrorCodes::DECODE_FAILED,
            AudioError::WriteFailed { .. } => AudioErrorCodes::WRITE_FAILED,
            AudioError::ResampleFailed { .. } => AudioErrorCodes::RESAMPLE_FAILED,
            AudioError::EmptyFileList => AudioErrorCodes::EMPTY_FILE_LIST,
            AudioError::Io { .. } => AudioErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::FileNotFound { path } => {
                format!("The given file {} does not exist", path)
            }
            AudioError::DirectoryNotFound { path } => {
                format!("The given filepath {} does not exist", path)
            }
            AudioError::DecodeFailed { path, reason } => {
                format!("Failed to decode {}: {}", path, reason)
            }
            AudioError::WriteFailed { path, reason } => {
                format!("Failed to write {}: {}", path, reason)
            }
            AudioError::ResampleFailed { reason } => format!("Resampling failed: {}", reason),
            AudioError::EmptyFileList => "No audio files were provided".to_string(),
            AudioError::Io { details } => format!("I/O error: {}", details),
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

/// Convert from std::io::Error to AudioError
impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::Io {
            details: err.to_string(),
        }
    }
}
