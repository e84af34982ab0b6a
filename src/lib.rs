// Clippy configuration for bodega crate
// Allow repeated module stems (model::ModelVersion, registry::RegistryConfig)
#![allow(clippy::module_name_repetitions)]
// Allow map().unwrap_or() pattern
#![allow(clippy::map_unwrap_or)]
// Allow Result wrapping for API consistency
#![allow(clippy::unnecessary_wraps)]
// Doc backticks optional
#![allow(clippy::doc_markdown)]
// Allow missing docs for internal items
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Bodega: Model Registry with a Staged Version Lifecycle
//!
//! Bodega tracks model families and their versions. Each version points at
//! an artifact by URI, carries free-form tags and the provenance of the run
//! that produced it, and moves through a small lifecycle (`none`, `staging`,
//! `production`, `archived`).
//!
//! # Quick Start
//!
//! ```
//! use bodega::prelude::*;
//!
//! let registry = SqliteRegistry::in_memory()?;
//!
//! // Register a version; the model family is created on the fly.
//! let version = registry.register_model_version(
//!     "fraud-detector",
//!     VersionRequest::new("file:///models/fraud.bin")
//!         .with_tag("bodega_pipeline_name", "nightly-train"),
//! )?;
//! assert_eq!(version.version, "1");
//! assert_eq!(version.provenance.pipeline_name.as_deref(), Some("nightly-train"));
//!
//! // Promote it.
//! registry.update_model_version(
//!     "fraud-detector",
//!     &version.version,
//!     VersionUpdate::new().with_stage(VersionStage::Production),
//! )?;
//! # Ok::<(), bodega::error::BodegaError>(())
//! ```
//!
//! # Architecture
//!
//! - **[`ModelRegistry`]** - the backend contract: registrations, versions,
//!   stage changes, artifact loading
//! - **[`SqliteRegistry`]** - the bundled backend, one database file per
//!   registry
//! - **[`FlavorRegistry`](registry::FlavorRegistry)** - maps flavor names to
//!   backend constructors, so callers select a backend by configuration
//!
//! Registry metadata is stored in `SQLite` at `~/.bodega/registry.db`;
//! artifacts stay wherever their source URI points.

pub mod cli;
pub mod error;
pub mod loader;
pub mod model;
pub mod prelude;
pub mod registry;

pub use error::{BodegaError, Result};
pub use registry::{ModelRegistry, RegistryConfig, SqliteRegistry};
