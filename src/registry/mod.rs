//! Model registry capability and its concrete backends.
//!
//! [`ModelRegistry`] defines the contract; [`SqliteRegistry`] is the
//! in-tree backend and [`FlavorRegistry`] maps flavor names to backend
//! constructors.

mod flavor;
mod sqlite;

pub use flavor::{FlavorConstructor, FlavorRegistry, RegistryFlavor};
pub use sqlite::SqliteRegistry;

use crate::error::{BodegaError, Result};
use crate::model::{ModelRegistration, ModelVersion, RunProvenance, VersionStage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn default_flavor() -> String {
    "sqlite".to_string()
}

/// Configuration for a registry backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base path for the registry.
    pub base_path: PathBuf,
    /// Backend flavor name used when constructing through [`FlavorRegistry`].
    #[serde(default = "default_flavor")]
    pub flavor: String,
}

impl RegistryConfig {
    /// Create a new config with the given base path and the default flavor.
    #[must_use]
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            flavor: default_flavor(),
        }
    }

    /// Set the backend flavor.
    #[must_use]
    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = flavor.into();
        self
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.base_path.join("registry.db")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_path.join("config.toml")
    }

    /// Parse a config from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize the config to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a config from its TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Write the config to `config.toml` under the base path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        std::fs::write(self.config_path(), self.to_toml()?)?;
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        let home = dirs_path();
        Self::new(home.join(".bodega"))
    }
}

fn dirs_path() -> PathBuf {
    std::env::var("HOME").map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

/// True when `tags` contains every pair in `required`.
///
/// This is the superset semantics used by all tag filters: a candidate
/// matches when each required key is present with an equal value.
#[must_use]
pub fn tags_contain(tags: &HashMap<String, String>, required: &HashMap<String, String>) -> bool {
    required
        .iter()
        .all(|(key, value)| tags.get(key) == Some(value))
}

fn validate_tags_filter(tags: Option<&HashMap<String, String>>, what: &str) -> Result<()> {
    match tags {
        Some(map) if map.is_empty() => Err(BodegaError::Validation(format!(
            "{what}: tags filter must not be empty; omit it to match everything"
        ))),
        _ => Ok(()),
    }
}

/// Filter for [`ModelRegistry::list_models`].
///
/// Criteria are conjunctive. Name matching is backend-defined; the SQLite
/// backend matches case-sensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct ModelFilter {
    /// Match registrations whose name contains this string.
    pub name: Option<String>,
    /// Match registrations whose tags contain all of these pairs.
    pub tags: Option<HashMap<String, String>>,
}

impl ModelFilter {
    /// Create an empty filter matching every registration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name criterion.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the tags criterion.
    #[must_use]
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Check the filter for malformed criteria.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the tags criterion is present but empty.
    pub fn validate(&self) -> Result<()> {
        validate_tags_filter(self.tags.as_ref(), "model filter")
    }
}

/// Filter for [`ModelRegistry::list_model_versions`].
///
/// Criteria are conjunctive; an empty filter matches every version. The
/// name criterion is an exact parent-registration match.
#[derive(Debug, Clone, Default)]
pub struct VersionFilter {
    /// Match versions registered under exactly this model name.
    pub name: Option<String>,
    /// Match versions with exactly this source URI.
    pub model_source_uri: Option<String>,
    /// Match versions whose tags contain all of these pairs.
    pub tags: Option<HashMap<String, String>>,
}

impl VersionFilter {
    /// Create an empty filter matching every version.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the parent-name criterion.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the source-URI criterion.
    #[must_use]
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.model_source_uri = Some(uri.into());
        self
    }

    /// Set the tags criterion.
    #[must_use]
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Check the filter for malformed criteria.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the tags criterion is present but empty.
    pub fn validate(&self) -> Result<()> {
        validate_tags_filter(self.tags.as_ref(), "version filter")
    }
}

/// Parameters for [`ModelRegistry::register_model_version`].
#[derive(Debug, Clone)]
pub struct VersionRequest {
    /// Opaque locator of the artifact being registered.
    pub model_source_uri: String,
    /// Explicit version identifier; the backend allocates one when omitted.
    pub version: Option<String>,
    /// Version description.
    pub description: Option<String>,
    /// Version tags; reserved provenance keys are promoted before storage.
    pub tags: HashMap<String, String>,
    /// Opaque metadata passed through to the backend.
    pub registry_metadata: HashMap<String, String>,
    /// Provenance of the producing run.
    pub provenance: RunProvenance,
    /// Description for the parent registration, used only when it is
    /// auto-created by this call.
    pub model_description: Option<String>,
    /// Tags for the parent registration, used only when it is auto-created.
    pub model_tags: HashMap<String, String>,
}

impl VersionRequest {
    /// Create a request for the given artifact URI.
    #[must_use]
    pub fn new(model_source_uri: impl Into<String>) -> Self {
        Self {
            model_source_uri: model_source_uri.into(),
            version: None,
            description: None,
            tags: HashMap::new(),
            registry_metadata: HashMap::new(),
            provenance: RunProvenance::default(),
            model_description: None,
            model_tags: HashMap::new(),
        }
    }

    /// Set an explicit version identifier.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the version description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a single version tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set the version tags.
    #[must_use]
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the opaque registry metadata.
    #[must_use]
    pub fn with_registry_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.registry_metadata = metadata;
        self
    }

    /// Set the run provenance.
    #[must_use]
    pub fn with_provenance(mut self, provenance: RunProvenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Set the parent-registration description for auto-creation.
    #[must_use]
    pub fn with_model_description(mut self, description: impl Into<String>) -> Self {
        self.model_description = Some(description.into());
        self
    }

    /// Set the parent-registration tags for auto-creation.
    #[must_use]
    pub fn with_model_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.model_tags = tags;
        self
    }
}

/// Partial update for [`ModelRegistry::update_model_version`].
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct VersionUpdate {
    /// New description.
    pub description: Option<String>,
    /// Tag pairs merged into the existing tags.
    pub tags: Option<HashMap<String, String>>,
    /// New lifecycle stage.
    pub stage: Option<VersionStage>,
}

impl VersionUpdate {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the tag pairs to merge.
    #[must_use]
    pub fn with_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Set the stage.
    #[must_use]
    pub fn with_stage(mut self, stage: VersionStage) -> Self {
        self.stage = Some(stage);
        self
    }
}

/// Capability contract for a model-registry backend.
///
/// A backend persists model registrations and the versions they own. Every
/// call is a synchronous round trip to the backing store; the interface adds
/// no caching, batching, or locking of its own, so consistency under
/// concurrent use is whatever the backend provides. `(name, version)` is the
/// natural key for versions.
///
/// Stage changes are unconditionally accepted, any stage to any stage: the
/// registry records lifecycle state, it does not enforce a promotion
/// workflow.
pub trait ModelRegistry {
    /// Register a new model family.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` when the name is taken and `Validation` when
    /// the name is empty.
    fn register_model(
        &self,
        name: &str,
        description: Option<String>,
        tags: HashMap<String, String>,
    ) -> Result<ModelRegistration>;

    /// Update a registration. Only provided fields change; tag pairs are
    /// merged into the existing tags, never removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the name is unknown.
    fn update_model(
        &self,
        name: &str,
        description: Option<String>,
        tags: Option<HashMap<String, String>>,
    ) -> Result<ModelRegistration>;

    /// Fetch a registration by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the name is unknown.
    fn get_model(&self, name: &str) -> Result<ModelRegistration>;

    /// List registrations matching the filter, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed filters.
    fn list_models(&self, filter: &ModelFilter) -> Result<Vec<ModelRegistration>>;

    /// Delete a registration and every version it owns.
    ///
    /// The cascade is all-or-nothing: when the call fails, no version has
    /// been removed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the name is unknown.
    fn delete_model(&self, name: &str) -> Result<()>;

    /// Whether a registration exists.
    ///
    /// Never fails: backend errors report `false`.
    fn check_model_exists(&self, name: &str) -> bool;

    /// Register a model version, auto-creating the parent registration when
    /// absent. Reserved provenance keys in the request tags are promoted
    /// into provenance before the record is stored. Not idempotent at the
    /// version level: an explicit duplicate `(name, version)` fails, while an
    /// omitted version allocates a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` for a duplicate `(name, version)` and
    /// `Validation` for an empty name, source URI, or explicit version.
    fn register_model_version(&self, name: &str, request: VersionRequest) -> Result<ModelVersion>;

    /// Update a version. Only provided fields change; tag pairs are merged
    /// into the existing tags. Stage changes are unconditionally accepted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `(name, version)` is unknown.
    fn update_model_version(
        &self,
        name: &str,
        version: &str,
        update: VersionUpdate,
    ) -> Result<ModelVersion>;

    /// Delete a single version.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `(name, version)` is unknown.
    fn delete_model_version(&self, name: &str, version: &str) -> Result<()>;

    /// List versions matching the filter, ordered by name and creation time.
    /// An empty filter returns every version in the registry.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed filters.
    fn list_model_versions(&self, filter: &VersionFilter) -> Result<Vec<ModelVersion>>;

    /// Fetch a version by its natural key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `(name, version)` is unknown.
    fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion>;

    /// Whether a version exists.
    ///
    /// Never fails: backend errors report `false`.
    fn check_model_version_exists(&self, name: &str, version: &str) -> bool;

    /// Resolve the version's source URI and read the backing artifact.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `(name, version)` is unknown and `Load` when
    /// the artifact cannot be read.
    fn load_model_version(&self, name: &str, version: &str) -> Result<Vec<u8>>;
}
