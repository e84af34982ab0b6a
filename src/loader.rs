//! Artifact loading.
//!
//! A model version stores an opaque `model_source_uri` that the registry core
//! never interprets. A loader turns that URI into raw artifact bytes at load
//! time; typed deserialization belongs to the framework calling the registry.

use crate::error::{BodegaError, Result};
use std::path::PathBuf;

/// Turns a model source URI into the raw bytes of the backing artifact.
///
/// Implementations are storage- or framework-specific. Every failure must
/// surface as [`BodegaError::Load`] carrying the offending URI and the
/// underlying cause, so callers can distinguish a broken artifact from a
/// missing registry record.
pub trait ArtifactLoader {
    /// Load the artifact behind `source_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`BodegaError::Load`] when the URI scheme is unsupported or
    /// the artifact cannot be read.
    fn load(&self, source_uri: &str) -> Result<Vec<u8>>;
}

/// Loader for `file://` URIs and bare filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    /// Create a file loader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn resolve(source_uri: &str) -> Result<PathBuf> {
        match source_uri.split_once("://") {
            Some(("file", path)) => Ok(PathBuf::from(path)),
            Some((scheme, _)) => Err(BodegaError::Load {
                uri: source_uri.to_string(),
                source: format!("unsupported scheme '{scheme}'").into(),
            }),
            None => Ok(PathBuf::from(source_uri)),
        }
    }
}

impl ArtifactLoader for FileLoader {
    fn load(&self, source_uri: &str) -> Result<Vec<u8>> {
        let path = Self::resolve(source_uri)?;
        std::fs::read(path).map_err(|e| BodegaError::Load {
            uri: source_uri.to_string(),
            source: Box::new(e),
        })
    }
}
