//! Provenance of the pipeline run that produced a model version.
//!
//! Producers may pass provenance either as structured fields or as reserved
//! tag keys; [`promote_reserved_tags`] folds the latter into the former so
//! tags and provenance never overlap in stored records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tag key promoted into [`RunProvenance::framework_version`].
pub const TAG_FRAMEWORK_VERSION: &str = "bodega_version";
/// Tag key promoted into [`RunProvenance::pipeline_run_id`].
pub const TAG_PIPELINE_RUN_ID: &str = "bodega_pipeline_run_id";
/// Tag key promoted into [`RunProvenance::pipeline_name`].
pub const TAG_PIPELINE_NAME: &str = "bodega_pipeline_name";
/// Tag key promoted into [`RunProvenance::step_name`].
pub const TAG_STEP_NAME: &str = "bodega_step_name";

/// All tag keys reserved for provenance promotion.
pub const RESERVED_TAG_KEYS: [&str; 4] = [
    TAG_FRAMEWORK_VERSION,
    TAG_PIPELINE_RUN_ID,
    TAG_PIPELINE_NAME,
    TAG_STEP_NAME,
];

/// Structured provenance of the run that registered a model version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProvenance {
    /// Version of the framework that performed the registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_version: Option<String>,
    /// Name of the producing pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_name: Option<String>,
    /// Identifier of the producing pipeline run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_run_id: Option<String>,
    /// Name of the producing pipeline step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
}

impl RunProvenance {
    /// Create empty provenance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the framework version.
    #[must_use]
    pub fn with_framework_version(mut self, version: impl Into<String>) -> Self {
        self.framework_version = Some(version.into());
        self
    }

    /// Set the producing pipeline name.
    #[must_use]
    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }

    /// Set the producing pipeline run id.
    #[must_use]
    pub fn with_pipeline_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.pipeline_run_id = Some(run_id.into());
        self
    }

    /// Set the producing step name.
    #[must_use]
    pub fn with_step_name(mut self, name: impl Into<String>) -> Self {
        self.step_name = Some(name.into());
        self
    }

    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.framework_version.is_none()
            && self.pipeline_name.is_none()
            && self.pipeline_run_id.is_none()
            && self.step_name.is_none()
    }
}

/// Extract reserved tag keys into structured provenance.
///
/// Pure: consumes the raw tags and provenance, returns the normalized pair.
/// Reserved keys are always removed from the tags, and a present key's value
/// is written into the matching provenance field, replacing any value set
/// there directly. Applying the function twice yields the same result.
#[must_use]
pub fn promote_reserved_tags(
    tags: HashMap<String, String>,
    provenance: RunProvenance,
) -> (HashMap<String, String>, RunProvenance) {
    let mut tags = tags;
    let mut provenance = provenance;

    let slots = [
        (TAG_FRAMEWORK_VERSION, &mut provenance.framework_version),
        (TAG_PIPELINE_NAME, &mut provenance.pipeline_name),
        (TAG_PIPELINE_RUN_ID, &mut provenance.pipeline_run_id),
        (TAG_STEP_NAME, &mut provenance.step_name),
    ];
    for (key, slot) in slots {
        if let Some(value) = tags.remove(key) {
            *slot = Some(value);
        }
    }

    (tags, provenance)
}
