//! Per-item transcoding errors.
//!
//! These never escalate past a single item; the pipeline records them as a
//! failed outcome and moves on.

use aurelion_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Why a thumbnail could not be produced.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The source could not be decoded or the output encoded.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Reading the source or writing the output failed.
    #[error("I/O error during transcode: {0}")]
    Io(#[from] std::io::Error),

    /// A helper binary could not be started.
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        /// The binary that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A helper binary exited unsuccessfully.
    #[error("{program} exited with code {code}: {stderr}")]
    ProcessFailed {
        /// The binary that failed.
        program: String,
        /// Exit code (-1 when killed by a signal).
        code: i32,
        /// Truncated stderr output.
        stderr: String,
    },

    /// The transcode ran past its deadline and was killed.
    #[error("Transcode timed out after {0} seconds")]
    Timeout(u64),

    /// The helper ran but left no output behind.
    #[error("Transcoder produced no output")]
    OutputMissing,

    /// The blocking worker panicked or was cancelled.
    #[error("Transcode task aborted: {0}")]
    Aborted(String),
}

impl From<TranscodeError> for AppError {
    fn from(err: TranscodeError) -> Self {
        AppError::with_source(ErrorKind::TranscodeFailure, "Thumbnail generation failed", err)
    }
}
