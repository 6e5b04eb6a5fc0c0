//! # Error Types Module
//!
//! Custom error types for probing and conversion.
//!
//! ## Categories:
//! - `ToolNotFound`: ffmpeg / ffprobe binary missing
//! - `UnsupportedFormat`: source extension known to have no exportable metadata
//! - `ProbeExecutionFailed`: ffprobe could not be run or exited non-zero
//! - `MetadataDecodeFailed`: ffprobe output is not a JSON object
//! - `PathResolutionFailed`: working directory lookup failed
//! - `SourceNotFound`: the resolved source path does not exist
//!
//! Errors that happen after a conversion has been handed to the caller are not
//! part of `WrapperError`: they travel as [`ConversionFailure`] inside the
//! terminal event of the stream.
//!
//! ## Example:
//! ```rust,ignore
//! if !tool_exists {
//!     return Err(WrapperError::ToolNotFound { tool: "ffmpeg".to_string() });
//! }
//! ```

use std::path::PathBuf;
use std::process::ExitStatus;

/// Errors returned synchronously by the wrapper, before any conversion starts
#[derive(thiserror::Error, Debug)]
pub enum WrapperError {
    #[error("{tool} is not installed")]
    ToolNotFound { tool: String },

    #[error("Unsupported file format, no metadata can be exported: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to read metadata: {0}")]
    ProbeExecutionFailed(#[source] ProbeFailure),

    #[error("Failed to decode metadata JSON: {0}")]
    MetadataDecodeFailed(#[from] serde_json::Error),

    #[error("Cannot determine working directory: {0}")]
    PathResolutionFailed(#[source] std::io::Error),

    #[error("No such file: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WrapperError {
    pub fn tool_not_found(tool: &str) -> Self {
        Self::ToolNotFound {
            tool: tool.to_string(),
        }
    }
}

/// Why ffprobe produced no usable output
#[derive(thiserror::Error, Debug)]
pub enum ProbeFailure {
    #[error("could not start ffprobe: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffprobe exited with {status}: {stderr}")]
    Exit { status: ExitStatus, stderr: String },
}

/// Failure of a conversion after its event stream was returned
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionFailure {
    #[error("Error starting ffmpeg: {0}")]
    SpawnFailed(String),

    #[error("ffmpeg exited with {0}")]
    ExitFailed(String),

    #[error("Error waiting for ffmpeg: {0}")]
    WaitFailed(String),
}

pub type Result<T> = std::result::Result<T, WrapperError>;
