//! # ffmpeg_wrapper
//!
//! Async wrapper around the ffprobe and ffmpeg command line tools.
//!
//! ## Responsibilities:
//! - Resolve source paths and locate the external tools
//! - Read file metadata with ffprobe as an opaque JSON document
//! - Run ffmpeg conversions and stream their stderr progress as events
//!
//! ## Modules:
//! - `config`: tool locations, tokenizer strategy, event buffer
//! - `error`: `WrapperError` and post-start `ConversionFailure`
//! - `tool_resolver`: ffmpeg/ffprobe lookup
//! - `path_resolver`: source and output path rules
//! - `probe`: ffprobe invocation and `Metadata`
//! - `media_file`: resolved source plus metadata
//! - `tokenizer`: CR/LF line splitting and the legacy stats regrouping
//! - `normalize`: whitespace collapsing of status lines
//! - `events`: the conversion event stream
//! - `supervisor`: the ffmpeg launcher/drainer pair
//! - `progress`: terminal spinner for the CLI
//!
//! ## Usage:
//! ```rust,no_run
//! use ffmpeg_wrapper::{Config, ConversionSupervisor, MediaFile};
//!
//! # async fn run() -> Result<(), ffmpeg_wrapper::WrapperError> {
//! let config = Config::default();
//! let media = MediaFile::open("clip.mp4")?;
//! let mut events = ConversionSupervisor::new(&config).convert(&media, "small.mp4", &[])?;
//! while let Some(event) = events.recv().await {
//!     println!("{}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod media_file;
pub mod normalize;
pub mod path_resolver;
pub mod probe;
pub mod progress;
pub mod supervisor;
pub mod tokenizer;
pub mod tool_resolver;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{ConversionFailure, WrapperError};
pub use events::{ConversionEvent, ConversionEvents};
pub use media_file::MediaFile;
pub use probe::{Metadata, MetadataProber};
pub use supervisor::ConversionSupervisor;
pub use tool_resolver::ToolResolver;
