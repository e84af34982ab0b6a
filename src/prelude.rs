//! Convenient re-exports for common usage.
//!
//! ```
//! use bodega::prelude::*;
//! ```

// Core types
pub use crate::error::{BodegaError, Result};
pub use crate::registry::{
    FlavorRegistry, ModelFilter, ModelRegistry, RegistryConfig, RegistryFlavor, SqliteRegistry,
    VersionFilter, VersionRequest, VersionUpdate,
};

// Model types
pub use crate::model::{
    promote_reserved_tags, ModelRegistration, ModelVersion, RunProvenance, VersionStage,
};

// Artifact loading
pub use crate::loader::{ArtifactLoader, FileLoader};
