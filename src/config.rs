//! # Configuration Management Module
//!
//! Runtime configuration for the wrapper.
//!
//! ## Parameters:
//! - `ffmpeg_path` / `ffprobe_path`: explicit tool binaries (default: None = lookup)
//! - `tools_dir`: directory with bundled tools, searched before `PATH`
//! - `tokenizer`: how the ffmpeg diagnostic stream is split (default: `lines`)
//! - `event_buffer`: capacity of the conversion event channel (default: 64)
//!
//! ## Sources, later wins:
//! 1. `Config::default()`
//! 2. JSON file (`Config::from_file`), by default `<config_dir>/ffwrap/config.json`
//! 3. Environment: `FFWRAP_FFMPEG`, `FFWRAP_FFPROBE`, `TOOLS_DIR`
//!
//! ## Example:
//! ```rust,ignore
//! let config = Config {
//!     ffmpeg_path: Some("/opt/ffmpeg/bin/ffmpeg".into()),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Strategy used to cut the ffmpeg diagnostic stream into events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// One event per CR- or LF-terminated line
    #[default]
    Lines,
    /// Legacy: regroup whitespace-separated `key=value` words, seven per event
    StatsWords,
}

/// Configuration for probing and conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit ffmpeg binary
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary
    pub ffprobe_path: Option<PathBuf>,
    /// Directory with bundled tools
    pub tools_dir: Option<PathBuf>,
    /// Diagnostic stream tokenizer
    pub tokenizer: TokenizerKind,
    /// Capacity of the conversion event channel
    pub event_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            tools_dir: None,
            tokenizer: TokenizerKind::Lines,
            event_buffer: 64,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer == 0 {
            return Err(anyhow::anyhow!("Event buffer must be greater than 0"));
        }

        if let Some(ref tools_dir) = self.tools_dir {
            if !tools_dir.is_dir() {
                return Err(anyhow::anyhow!(
                    "Tools directory is not a directory: {}",
                    tools_dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ffwrap").join("config.json"))
    }

    /// Load configuration from file, falling back to defaults when it is missing
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` (or the default location) and apply environment overrides
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::from_file(&path).await?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var_os(key));
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        if let Some(path) = lookup("FFWRAP_FFMPEG") {
            self.ffmpeg_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("FFWRAP_FFPROBE") {
            self.ffprobe_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("TOOLS_DIR") {
            self.tools_dir = Some(PathBuf::from(dir));
        }
    }
}
