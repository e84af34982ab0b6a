//! Error types for registry operations.

use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, BodegaError>;

fn entity_ref(name: &str, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("'{name}' version '{v}'"),
        None => format!("'{name}'"),
    }
}

/// Errors that can occur during registry operations.
#[derive(Error, Debug)]
pub enum BodegaError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization failed.
    #[error("TOML error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    /// TOML serialization failed.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Registry entity not found.
    #[error("{kind} not found: {}", entity_ref(.name, .version.as_deref()))]
    NotFound {
        /// Kind of entity (model, model version, flavor).
        kind: String,
        /// Name of the entity.
        name: String,
        /// Version requested, for version-level lookups.
        version: Option<String>,
    },

    /// Registry entity already exists.
    #[error("{kind} already exists: {}", entity_ref(.name, .version.as_deref()))]
    AlreadyExists {
        /// Kind of entity.
        kind: String,
        /// Name of the entity.
        name: String,
        /// Version that exists, for version-level registration.
        version: Option<String>,
    },

    /// Input or filter validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Artifact could not be loaded from its source URI.
    #[error("failed to load artifact from '{uri}': {source}")]
    Load {
        /// Source URI the load was attempted from.
        uri: String,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No registry flavor registered under this name.
    #[error("unknown registry flavor: {0}")]
    UnknownFlavor(String),
}
