//! Model registry types.
//!
//! Provides model registrations, model versions, lifecycle stages, and run
//! provenance handling.

mod provenance;
mod stage;

pub use provenance::{
    promote_reserved_tags, RunProvenance, RESERVED_TAG_KEYS, TAG_FRAMEWORK_VERSION,
    TAG_PIPELINE_NAME, TAG_PIPELINE_RUN_ID, TAG_STEP_NAME,
};
pub use stage::VersionStage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A logical model family registered under a unique name.
///
/// Owns its versions: deleting a registration removes every version
/// registered under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistration {
    /// Unique model name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form string tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Registration timestamp, set by the backend.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp, set by the backend.
    pub last_updated_at: DateTime<Utc>,
}

impl ModelRegistration {
    /// Create a registration with the current time as both timestamps.
    ///
    /// Backends overwrite the timestamps with their own authoritative values
    /// when the record is persisted.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: None,
            tags: HashMap::new(),
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }
}

/// One trained-artifact snapshot under a registration.
///
/// `(name, version)` is the natural key: it uniquely identifies a version
/// within a registry. Stored tags never contain reserved provenance keys;
/// those are promoted into [`RunProvenance`] before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Parent registration name.
    pub name: String,
    /// Version identifier, caller-supplied or backend-assigned.
    pub version: String,
    /// Opaque locator of the backing artifact. The registry never parses it;
    /// only an artifact loader interprets the scheme.
    pub model_source_uri: String,
    /// Human-readable description of this version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current lifecycle stage.
    #[serde(default)]
    pub stage: VersionStage,
    /// Free-form string tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Opaque metadata passed through to the backend.
    #[serde(default)]
    pub registry_metadata: HashMap<String, String>,
    /// Provenance of the producing run.
    #[serde(default)]
    pub provenance: RunProvenance,
    /// Creation timestamp, set by the backend.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp, set by the backend.
    pub last_updated_at: DateTime<Utc>,
}

impl ModelVersion {
    /// Create a version record with stage `none` and the current time as
    /// both timestamps.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        model_source_uri: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            version: version.into(),
            model_source_uri: model_source_uri.into(),
            description: None,
            stage: VersionStage::default(),
            tags: HashMap::new(),
            registry_metadata: HashMap::new(),
            provenance: RunProvenance::default(),
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: VersionStage) -> Self {
        self.stage = stage;
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the registry metadata.
    #[must_use]
    pub fn with_registry_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.registry_metadata = metadata;
        self
    }

    /// Set the provenance.
    #[must_use]
    pub fn with_provenance(mut self, provenance: RunProvenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// `name:version` reference string.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }
}
