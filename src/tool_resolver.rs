//! # Tool Path Resolver
//!
//! Finds the ffmpeg and ffprobe binaries:
//! - Explicit path from configuration
//! - Bundled tools directory
//! - System `PATH`

use crate::config::Config;
use crate::error::{Result, WrapperError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Tool path resolver for ffmpeg/ffprobe
#[derive(Debug, Clone, Default)]
pub struct ToolResolver {
    ffmpeg_path: Option<PathBuf>,
    ffprobe_path: Option<PathBuf>,
    tools_dir: Option<PathBuf>,
}

impl ToolResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
            tools_dir: config.tools_dir.clone(),
        }
    }

    fn explicit_path(&self, tool_name: &str) -> Option<&Path> {
        match tool_name {
            FFMPEG => self.ffmpeg_path.as_deref(),
            FFPROBE => self.ffprobe_path.as_deref(),
            _ => None,
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Result<PathBuf> {
        debug!("Resolving tool: {}", tool_name);

        // A configured path is authoritative, no fallback when it is wrong
        if let Some(path) = self.explicit_path(tool_name) {
            if path.is_file() {
                debug!("Using configured tool: {} -> {:?}", tool_name, path);
                return Ok(path.to_path_buf());
            }
            warn!("Configured {} does not exist: {:?}", tool_name, path);
            return Err(WrapperError::tool_not_found(tool_name));
        }

        if let Some(ref tools_dir) = self.tools_dir {
            if let Some(path) = Self::bundled_tool_path(tools_dir, tool_name) {
                debug!("Using bundled tool: {} -> {:?}", tool_name, path);
                return Ok(path);
            }
            debug!("{} not bundled in {:?}", tool_name, tools_dir);
        }

        match which::which(tool_name) {
            Ok(path) => {
                debug!("Using system tool: {} -> {:?}", tool_name, path);
                Ok(path)
            }
            Err(e) => {
                warn!("Tool not found: {} ({})", tool_name, e);
                Err(WrapperError::tool_not_found(tool_name))
            }
        }
    }

    /// Try `<dir>/<tool>` then `<dir>/<tool>/<tool>`
    fn bundled_tool_path(tools_dir: &Path, tool_name: &str) -> Option<PathBuf> {
        let file_name = format!("{}{}", tool_name, std::env::consts::EXE_SUFFIX);

        [
            tools_dir.join(&file_name),
            tools_dir.join(tool_name).join(&file_name),
        ]
        .into_iter()
        .find(|path| path.is_file())
    }

    pub fn ffmpeg(&self) -> Result<PathBuf> {
        self.resolve_tool(FFMPEG)
    }

    pub fn ffprobe(&self) -> Result<PathBuf> {
        self.resolve_tool(FFPROBE)
    }

    /// Get a report of tool availability
    pub fn tools_report(&self) -> String {
        let mut report = String::from("Tool availability:\n");
        for tool in [FFMPEG, FFPROBE] {
            match self.resolve_tool(tool) {
                Ok(path) => report.push_str(&format!("  ✅ {} -> {}\n", tool, path.display())),
                Err(_) => report.push_str(&format!("  ❌ {} (not found)\n", tool)),
            }
        }
        report
    }
}
