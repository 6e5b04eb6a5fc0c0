//! # Metadata Probing Module
//!
//! Runs ffprobe once per file and keeps its JSON answer as an opaque document.
//!
//! ## Invocation:
//! ```text
//! ffprobe -show_format -show_streams -pretty -print_format json -hide_banner -i <file>
//! ```
//!
//! The document shape depends entirely on the installed ffprobe version, so
//! [`Metadata`] wraps a JSON object instead of a fixed record. `format` and
//! `streams` have accessors because every ffprobe prints them for these flags.
//!
//! HEIC sources short-circuit with `UnsupportedFormat`: ffprobe has nothing
//! exportable for them and no process is started.

use crate::error::{ProbeFailure, Result, WrapperError};
use crate::tool_resolver::{ToolResolver, FFPROBE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Fixed ffprobe flags; the input flag and path are appended per call
pub const PROBE_ARGS: [&str; 7] = [
    "-show_format",
    "-show_streams",
    "-pretty",
    "-print_format",
    "json",
    "-hide_banner",
    "-i",
];

const UNSUPPORTED_EXTENSION: &str = "heic";

/// ffprobe output: any JSON object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    /// Container description (`format` section)
    pub fn format(&self) -> Option<&Map<String, Value>> {
        self.0.get("format").and_then(Value::as_object)
    }

    /// Stream descriptors, empty when ffprobe reported none
    pub fn streams(&self) -> &[Value] {
        self.0
            .get("streams")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// True when ffprobe has no exportable metadata for this file
pub fn is_unsupported(path: &Path) -> bool {
    let extension = match path.extension() {
        Some(ext) => ext.to_str(),
        // A bare `.heic` has a file name but no extension
        None => path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix('.')),
    };
    extension
        .map(|ext| ext.eq_ignore_ascii_case(UNSUPPORTED_EXTENSION))
        .unwrap_or(false)
}

/// Runs ffprobe and decodes its output
#[derive(Debug, Clone)]
pub struct MetadataProber {
    tools: ToolResolver,
}

impl MetadataProber {
    pub fn new(tools: ToolResolver) -> Self {
        Self { tools }
    }

    /// Probe a file; resolves once ffprobe has exited
    pub async fn probe(&self, path: &Path) -> Result<Metadata> {
        if is_unsupported(path) {
            debug!("Skipping ffprobe for {}", path.display());
            return Err(WrapperError::UnsupportedFormat(path.to_path_buf()));
        }

        let ffprobe = self.tools.ffprobe()?;
        debug!("Probing {} with {}", path.display(), ffprobe.display());

        let output = Command::new(&ffprobe)
            .args(PROBE_ARGS)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                warn!("Failed to execute {}: {}", ffprobe.display(), e);
                if e.kind() == std::io::ErrorKind::NotFound {
                    WrapperError::tool_not_found(FFPROBE)
                } else {
                    WrapperError::ProbeExecutionFailed(ProbeFailure::Spawn(e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("ffprobe failed for {}: {}", path.display(), stderr);
            return Err(WrapperError::ProbeExecutionFailed(ProbeFailure::Exit {
                status: output.status,
                stderr,
            }));
        }

        let metadata: Metadata = serde_json::from_slice(&output.stdout).map_err(|e| {
            warn!("Failed unmarshal ffprobe output for {}: {}", path.display(), e);
            WrapperError::MetadataDecodeFailed(e)
        })?;

        debug!(
            "Probed {}: {} stream(s)",
            path.display(),
            metadata.streams().len()
        );
        Ok(metadata)
    }
}
