// Error types for the machine sound preprocessing pipeline
//
// This module defines custom error types for audio I/O and feature operations,
// providing structured error handling with stable numeric error codes so that
// callers (and the CLI) can branch on failures instead of checking sentinels.

mod audio;
mod feature;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use feature::{log_feature_error, FeatureError, FeatureErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// every pipeline stage.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
