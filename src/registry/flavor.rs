//! Named registry flavors.
//!
//! A flavor pairs a name with a constructor for a [`ModelRegistry`]
//! backend. Callers pick a backend by writing its flavor name into
//! [`RegistryConfig`]; new backends join by registering a flavor, not by
//! touching a type hierarchy.

use crate::error::{BodegaError, Result};
use crate::registry::{ModelRegistry, RegistryConfig, SqliteRegistry};
use std::collections::HashMap;

/// Constructor signature shared by every flavor.
pub type FlavorConstructor = fn(&RegistryConfig) -> Result<Box<dyn ModelRegistry>>;

/// A named, self-describing registry backend.
#[derive(Debug, Clone)]
pub struct RegistryFlavor {
    /// Name used in configuration to select this backend.
    pub name: String,
    /// Human-readable summary for listings.
    pub description: String,
    /// Builds the backend from a configuration.
    pub constructor: FlavorConstructor,
}

impl RegistryFlavor {
    /// Create a flavor record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        constructor: FlavorConstructor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            constructor,
        }
    }
}

fn build_sqlite(config: &RegistryConfig) -> Result<Box<dyn ModelRegistry>> {
    std::fs::create_dir_all(&config.base_path)?;
    Ok(Box::new(SqliteRegistry::open(config.db_path())?))
}

fn build_memory(_config: &RegistryConfig) -> Result<Box<dyn ModelRegistry>> {
    Ok(Box::new(SqliteRegistry::in_memory()?))
}

/// Lookup table of available flavors.
#[derive(Debug, Clone)]
pub struct FlavorRegistry {
    flavors: HashMap<String, RegistryFlavor>,
}

impl FlavorRegistry {
    /// Create an empty flavor table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flavors: HashMap::new(),
        }
    }

    /// Create a table holding the built-in flavors: `sqlite` and `memory`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RegistryFlavor::new(
            "sqlite",
            "File-backed registry under the configured base path",
            build_sqlite,
        ));
        registry.register(RegistryFlavor::new(
            "memory",
            "Transient in-memory registry",
            build_memory,
        ));
        registry
    }

    /// Add a flavor. A flavor with the same name is replaced.
    pub fn register(&mut self, flavor: RegistryFlavor) {
        self.flavors.insert(flavor.name.clone(), flavor);
    }

    /// Look up a flavor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegistryFlavor> {
        self.flavors.get(name)
    }

    /// Sorted flavor names.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.flavors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the backend named by `config.flavor`.
    ///
    /// # Errors
    ///
    /// Returns [`BodegaError::UnknownFlavor`] if no flavor carries that
    /// name, or the constructor's error if the backend cannot be built.
    pub fn create(&self, config: &RegistryConfig) -> Result<Box<dyn ModelRegistry>> {
        let flavor = self
            .get(&config.flavor)
            .ok_or_else(|| BodegaError::UnknownFlavor(config.flavor.clone()))?;
        (flavor.constructor)(config)
    }
}

impl Default for FlavorRegistry {
    /// The built-in flavor set.
    fn default() -> Self {
        Self::with_defaults()
    }
}
