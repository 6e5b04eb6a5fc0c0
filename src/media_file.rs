//! A source file on disk plus whatever ffprobe said about it.

use crate::error::Result;
use crate::path_resolver::PathResolver;
use crate::probe::{Metadata, MetadataProber};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MediaFile {
    path: PathBuf,
    metadata: Option<Metadata>,
}

impl MediaFile {
    /// Resolve `path` to an existing absolute path, without probing
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            path: PathResolver::resolve(path)?,
            metadata: None,
        })
    }

    /// Resolve `path` and read its metadata with ffprobe
    pub async fn probe(path: impl AsRef<Path>, prober: &MetadataProber) -> Result<Self> {
        let mut media = Self::open(path)?;
        media.analyze_metadata(prober).await?;
        Ok(media)
    }

    /// Populate metadata; a file that was already probed is left untouched
    pub async fn analyze_metadata(&mut self, prober: &MetadataProber) -> Result<&Metadata> {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => prober.probe(&self.path).await?,
        };
        Ok(self.metadata.insert(metadata))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}
