//! # Path Resolution Module
//!
//! Source paths are made absolute and checked for existence; output paths
//! follow one rule: an absolute output path whose directory exists is used as is,
//! anything else lands next to the source file under the requested file name.

use crate::error::{Result, WrapperError};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct PathResolver;

impl PathResolver {
    /// Make `path` absolute against the working directory and check it exists
    pub fn resolve(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let existing = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let cwd = std::env::current_dir().map_err(WrapperError::PathResolutionFailed)?;
            cwd.join(path)
        };

        match std::fs::metadata(&existing) {
            Ok(_) => {
                debug!("Resolved source: {} -> {}", path.display(), existing.display());
                Ok(existing)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(WrapperError::SourceNotFound(existing))
            }
            Err(e) => Err(WrapperError::Io(e)),
        }
    }

    /// Where ffmpeg should write for a given source and user output spec
    pub fn resolve_output_path(source: &Path, output_spec: &Path) -> PathBuf {
        let spec_dir_exists = output_spec.parent().map(Path::exists).unwrap_or(false);

        if output_spec.is_absolute() && spec_dir_exists {
            return output_spec.to_path_buf();
        }

        let base_name = output_spec
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| output_spec.to_path_buf());
        let source_dir = source.parent().unwrap_or(Path::new(""));
        let resolved = source_dir.join(base_name);
        debug!(
            "Output spec {} placed next to source: {}",
            output_spec.display(),
            resolved.display()
        );
        resolved
    }
}
