//! `SQLite`-backed model registry.

use crate::error::{BodegaError, Result};
use crate::loader::{ArtifactLoader, FileLoader};
use crate::model::{promote_reserved_tags, ModelRegistration, ModelVersion, VersionStage};
use crate::registry::{
    tags_contain, ModelFilter, ModelRegistry, VersionFilter, VersionRequest, VersionUpdate,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// `SQLite`-backed [`ModelRegistry`].
///
/// Registrations and versions live in two tables keyed by `name` and
/// `(model, version)`. Tag and metadata maps are stored as JSON text and
/// timestamps as RFC 3339 text. Deleting a model cascades to its versions
/// inside one transaction, so the registry is never left with orphans.
///
/// Artifacts are read through a [`FileLoader`] by default; swap in another
/// [`ArtifactLoader`] with [`SqliteRegistry::with_loader`].
pub struct SqliteRegistry {
    conn: Connection,
    loader: Box<dyn ArtifactLoader>,
}

impl SqliteRegistry {
    /// Open or create a registry database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let registry = Self {
            conn,
            loader: Box::new(FileLoader::new()),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    /// Open a transient in-memory registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let registry = Self {
            conn,
            loader: Box::new(FileLoader::new()),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    /// Replace the artifact loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn ArtifactLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            -- Model registrations
            CREATE TABLE IF NOT EXISTS models (
                name TEXT PRIMARY KEY,
                description TEXT,
                tags_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Model versions, owned by their registration
            CREATE TABLE IF NOT EXISTS model_versions (
                model TEXT NOT NULL,
                version TEXT NOT NULL,
                source_uri TEXT NOT NULL,
                description TEXT,
                stage TEXT NOT NULL DEFAULT 'none',
                tags_json TEXT NOT NULL DEFAULT '{}',
                metadata_json TEXT NOT NULL DEFAULT '{}',
                provenance_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(model, version)
            );

            CREATE INDEX IF NOT EXISTS idx_versions_model ON model_versions(model);
            CREATE INDEX IF NOT EXISTS idx_versions_stage ON model_versions(stage);
            CREATE INDEX IF NOT EXISTS idx_versions_source ON model_versions(source_uri);
            ",
        )?;
        Ok(())
    }

    // ==================== Row mapping ====================

    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| BodegaError::Validation("invalid timestamp".to_string()))
    }

    fn parse_map(json: &str) -> Result<HashMap<String, String>> {
        Ok(serde_json::from_str(json)?)
    }

    fn row_to_registration(
        row: (String, Option<String>, String, String, String),
    ) -> Result<ModelRegistration> {
        let (name, description, tags_json, created_str, updated_str) = row;
        Ok(ModelRegistration {
            name,
            description,
            tags: Self::parse_map(&tags_json)?,
            created_at: Self::parse_timestamp(&created_str)?,
            last_updated_at: Self::parse_timestamp(&updated_str)?,
        })
    }

    #[allow(clippy::type_complexity)]
    fn row_to_version(
        row: (
            String,
            String,
            String,
            Option<String>,
            String,
            String,
            String,
            String,
            String,
            String,
        ),
    ) -> Result<ModelVersion> {
        let (
            name,
            version,
            source_uri,
            description,
            stage_str,
            tags_json,
            metadata_json,
            provenance_json,
            created_str,
            updated_str,
        ) = row;

        Ok(ModelVersion {
            name,
            version,
            model_source_uri: source_uri,
            description,
            stage: stage_str.parse()?,
            tags: Self::parse_map(&tags_json)?,
            registry_metadata: Self::parse_map(&metadata_json)?,
            provenance: serde_json::from_str(&provenance_json)?,
            created_at: Self::parse_timestamp(&created_str)?,
            last_updated_at: Self::parse_timestamp(&updated_str)?,
        })
    }

    // ==================== Lookups ====================

    fn registration_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM models WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn version_exists(&self, name: &str, version: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM model_versions WHERE model = ?1 AND version = ?2",
            params![name, version],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Allocate the next version identifier for a model: one past the
    /// largest existing integral version, starting at "1". Non-integral
    /// versions never participate. Fails when the largest integral version
    /// cannot be incremented.
    fn next_version(&self, name: &str) -> Result<String> {
        let mut stmt = self
            .conn
            .prepare("SELECT version FROM model_versions WHERE model = ?1")?;
        let rows = stmt.query_map(params![name], |row| row.get::<_, String>(0))?;

        let mut max = 0u64;
        for row in rows {
            if let Ok(n) = row?.parse::<u64>() {
                max = max.max(n);
            }
        }
        let next = max.checked_add(1).ok_or_else(|| {
            BodegaError::Validation(format!(
                "cannot allocate a version after '{max}'; pass an explicit version"
            ))
        })?;
        Ok(next.to_string())
    }

    // ==================== Writes ====================

    fn insert_registration(&self, registration: &ModelRegistration) -> Result<()> {
        let tags_json = serde_json::to_string(&registration.tags)?;
        self.conn.execute(
            r"INSERT INTO models (name, description, tags_json, created_at, updated_at)
              VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                registration.name,
                registration.description,
                tags_json,
                registration.created_at.to_rfc3339(),
                registration.last_updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_version(&self, record: &ModelVersion) -> Result<()> {
        let tags_json = serde_json::to_string(&record.tags)?;
        let metadata_json = serde_json::to_string(&record.registry_metadata)?;
        let provenance_json = serde_json::to_string(&record.provenance)?;
        self.conn.execute(
            r"INSERT INTO model_versions
              (model, version, source_uri, description, stage, tags_json, metadata_json, provenance_json, created_at, updated_at)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.name,
                record.version,
                record.model_source_uri,
                record.description,
                record.stage.to_string(),
                tags_json,
                metadata_json,
                provenance_json,
                record.created_at.to_rfc3339(),
                record.last_updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BodegaError::Validation(
            "model name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn model_not_found(name: &str) -> BodegaError {
    BodegaError::NotFound {
        kind: "model".to_string(),
        name: name.to_string(),
        version: None,
    }
}

fn version_not_found(name: &str, version: &str) -> BodegaError {
    BodegaError::NotFound {
        kind: "model version".to_string(),
        name: name.to_string(),
        version: Some(version.to_string()),
    }
}

impl ModelRegistry for SqliteRegistry {
    fn register_model(
        &self,
        name: &str,
        description: Option<String>,
        tags: HashMap<String, String>,
    ) -> Result<ModelRegistration> {
        validate_name(name)?;
        if self.registration_exists(name)? {
            return Err(BodegaError::AlreadyExists {
                kind: "model".to_string(),
                name: name.to_string(),
                version: None,
            });
        }

        let now = Utc::now();
        let registration = ModelRegistration {
            name: name.to_string(),
            description,
            tags,
            created_at: now,
            last_updated_at: now,
        };
        self.insert_registration(&registration)?;
        debug!(model = name, "registered model");
        Ok(registration)
    }

    fn update_model(
        &self,
        name: &str,
        description: Option<String>,
        tags: Option<HashMap<String, String>>,
    ) -> Result<ModelRegistration> {
        let mut registration = self.get_model(name)?;
        if let Some(description) = description {
            registration.description = Some(description);
        }
        if let Some(tags) = tags {
            registration.tags.extend(tags);
        }
        registration.last_updated_at = Utc::now();

        let tags_json = serde_json::to_string(&registration.tags)?;
        self.conn.execute(
            "UPDATE models SET description = ?1, tags_json = ?2, updated_at = ?3 WHERE name = ?4",
            params![
                registration.description,
                tags_json,
                registration.last_updated_at.to_rfc3339(),
                name,
            ],
        )?;
        debug!(model = name, "updated model");
        Ok(registration)
    }

    fn get_model(&self, name: &str) -> Result<ModelRegistration> {
        let row = self
            .conn
            .query_row(
                r"SELECT name, description, tags_json, created_at, updated_at
                  FROM models WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => model_not_found(name),
                e => BodegaError::Database(e),
            })?;

        Self::row_to_registration(row)
    }

    fn list_models(&self, filter: &ModelFilter) -> Result<Vec<ModelRegistration>> {
        filter.validate()?;

        let mut stmt = self.conn.prepare(
            r"SELECT name, description, tags_json, created_at, updated_at
              FROM models ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        // Substring and tag criteria are applied after JSON decode.
        let mut registrations = Vec::new();
        for row in rows {
            let registration = Self::row_to_registration(row?)?;
            if let Some(name) = &filter.name {
                if !registration.name.contains(name.as_str()) {
                    continue;
                }
            }
            if let Some(required) = &filter.tags {
                if !tags_contain(&registration.tags, required) {
                    continue;
                }
            }
            registrations.push(registration);
        }
        Ok(registrations)
    }

    fn delete_model(&self, name: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        if !self.registration_exists(name)? {
            return Err(model_not_found(name));
        }
        let versions = self
            .conn
            .execute("DELETE FROM model_versions WHERE model = ?1", params![name])?;
        self.conn
            .execute("DELETE FROM models WHERE name = ?1", params![name])?;
        tx.commit()?;
        debug!(model = name, versions, "deleted model");
        Ok(())
    }

    fn check_model_exists(&self, name: &str) -> bool {
        self.registration_exists(name).unwrap_or(false)
    }

    fn register_model_version(&self, name: &str, request: VersionRequest) -> Result<ModelVersion> {
        validate_name(name)?;
        if request.model_source_uri.is_empty() {
            return Err(BodegaError::Validation(
                "model source URI must not be empty".to_string(),
            ));
        }
        if let Some(version) = &request.version {
            if version.is_empty() {
                return Err(BodegaError::Validation(
                    "version identifier must not be empty".to_string(),
                ));
            }
        }

        // Parent upsert, allocation, and insert are one atomic unit.
        let tx = self.conn.unchecked_transaction()?;

        if !self.registration_exists(name)? {
            let now = Utc::now();
            self.insert_registration(&ModelRegistration {
                name: name.to_string(),
                description: request.model_description.clone(),
                tags: request.model_tags.clone(),
                created_at: now,
                last_updated_at: now,
            })?;
            debug!(model = name, "auto-created registration");
        }

        let version = match &request.version {
            Some(version) => {
                if self.version_exists(name, version)? {
                    return Err(BodegaError::AlreadyExists {
                        kind: "model version".to_string(),
                        name: name.to_string(),
                        version: Some(version.clone()),
                    });
                }
                version.clone()
            }
            None => self.next_version(name)?,
        };

        let (tags, provenance) = promote_reserved_tags(request.tags, request.provenance);
        let now = Utc::now();
        let record = ModelVersion {
            name: name.to_string(),
            version,
            model_source_uri: request.model_source_uri,
            description: request.description,
            stage: VersionStage::None,
            tags,
            registry_metadata: request.registry_metadata,
            provenance,
            created_at: now,
            last_updated_at: now,
        };
        self.insert_version(&record)?;
        tx.commit()?;

        debug!(
            model = name,
            version = record.version.as_str(),
            "registered model version"
        );
        Ok(record)
    }

    fn update_model_version(
        &self,
        name: &str,
        version: &str,
        update: VersionUpdate,
    ) -> Result<ModelVersion> {
        let mut record = self.get_model_version(name, version)?;
        if let Some(description) = update.description {
            record.description = Some(description);
        }
        if let Some(tags) = update.tags {
            record.tags.extend(tags);
        }
        if let Some(stage) = update.stage {
            record.stage = stage;
        }

        // Merged tags may reintroduce reserved keys; keep them promoted.
        let (tags, provenance) = promote_reserved_tags(record.tags, record.provenance);
        record.tags = tags;
        record.provenance = provenance;
        record.last_updated_at = Utc::now();

        let tags_json = serde_json::to_string(&record.tags)?;
        let provenance_json = serde_json::to_string(&record.provenance)?;
        self.conn.execute(
            r"UPDATE model_versions
              SET description = ?1, stage = ?2, tags_json = ?3, provenance_json = ?4, updated_at = ?5
              WHERE model = ?6 AND version = ?7",
            params![
                record.description,
                record.stage.to_string(),
                tags_json,
                provenance_json,
                record.last_updated_at.to_rfc3339(),
                name,
                version,
            ],
        )?;
        debug!(
            model = name,
            version,
            stage = record.stage.to_string().as_str(),
            "updated model version"
        );
        Ok(record)
    }

    fn delete_model_version(&self, name: &str, version: &str) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM model_versions WHERE model = ?1 AND version = ?2",
            params![name, version],
        )?;
        if deleted == 0 {
            return Err(version_not_found(name, version));
        }
        debug!(model = name, version, "deleted model version");
        Ok(())
    }

    fn list_model_versions(&self, filter: &VersionFilter) -> Result<Vec<ModelVersion>> {
        filter.validate()?;

        // Exact criteria go into the query; tags are matched after decode.
        let mut conditions = Vec::new();
        let mut args = Vec::new();
        if let Some(name) = &filter.name {
            args.push(name.clone());
            conditions.push(format!("model = ?{}", args.len()));
        }
        if let Some(uri) = &filter.model_source_uri {
            args.push(uri.clone());
            conditions.push(format!("source_uri = ?{}", args.len()));
        }

        let mut sql = String::from(
            r"SELECT model, version, source_uri, description, stage, tags_json, metadata_json, provenance_json, created_at, updated_at
              FROM model_versions",
        );
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY model, created_at");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(&args), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
            ))
        })?;

        let mut versions = Vec::new();
        for row in rows {
            let record = Self::row_to_version(row?)?;
            if let Some(required) = &filter.tags {
                if !tags_contain(&record.tags, required) {
                    continue;
                }
            }
            versions.push(record);
        }
        Ok(versions)
    }

    fn get_model_version(&self, name: &str, version: &str) -> Result<ModelVersion> {
        let row = self
            .conn
            .query_row(
                r"SELECT model, version, source_uri, description, stage, tags_json, metadata_json, provenance_json, created_at, updated_at
                  FROM model_versions WHERE model = ?1 AND version = ?2",
                params![name, version],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                        row.get::<_, String>(9)?,
                    ))
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => version_not_found(name, version),
                e => BodegaError::Database(e),
            })?;

        Self::row_to_version(row)
    }

    fn check_model_version_exists(&self, name: &str, version: &str) -> bool {
        self.version_exists(name, version).unwrap_or(false)
    }

    fn load_model_version(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        let record = self.get_model_version(name, version)?;
        self.loader.load(&record.model_source_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> SqliteRegistry {
        SqliteRegistry::in_memory().unwrap()
    }

    fn tag_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_open_on_disk() {
        let dir = TempDir::new().unwrap();
        let registry = SqliteRegistry::open(dir.path().join("registry.db")).unwrap();
        registry
            .register_model("churn", None, HashMap::new())
            .unwrap();

        // Reopen and observe the persisted record.
        let registry = SqliteRegistry::open(dir.path().join("registry.db")).unwrap();
        assert!(registry.check_model_exists("churn"));
    }

    #[test]
    fn test_register_and_get_model_defaults() {
        let registry = setup();
        registry
            .register_model("fraud-detector", None, HashMap::new())
            .unwrap();

        let model = registry.get_model("fraud-detector").unwrap();
        assert_eq!(model.name, "fraud-detector");
        assert!(model.description.is_none());
        assert!(model.tags.is_empty());
    }

    #[test]
    fn test_register_model_with_fields() {
        let registry = setup();
        registry
            .register_model(
                "churn",
                Some("Churn prediction".to_string()),
                tag_map(&[("team", "growth")]),
            )
            .unwrap();

        let model = registry.get_model("churn").unwrap();
        assert_eq!(model.description.as_deref(), Some("Churn prediction"));
        assert_eq!(model.tags.get("team").map(String::as_str), Some("growth"));
    }

    #[test]
    fn test_register_model_duplicate_fails() {
        let registry = setup();
        registry.register_model("churn", None, HashMap::new()).unwrap();

        let result = registry.register_model("churn", None, HashMap::new());
        assert!(matches!(result, Err(BodegaError::AlreadyExists { .. })));
    }

    #[test]
    fn test_register_model_empty_name_fails() {
        let registry = setup();
        let result = registry.register_model("", None, HashMap::new());
        assert!(matches!(result, Err(BodegaError::Validation(_))));
    }

    #[test]
    fn test_get_model_not_found() {
        let registry = setup();
        let result = registry.get_model("ghost");
        assert!(matches!(result, Err(BodegaError::NotFound { .. })));
    }

    #[test]
    fn test_update_model_partial() {
        let registry = setup();
        registry
            .register_model("churn", None, tag_map(&[("team", "growth")]))
            .unwrap();

        let updated = registry
            .update_model("churn", Some("now described".to_string()), None)
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("now described"));
        assert_eq!(updated.tags.get("team").map(String::as_str), Some("growth"));

        // Tag pairs merge; existing keys not named stay put.
        let updated = registry
            .update_model("churn", None, Some(tag_map(&[("env", "prod")])))
            .unwrap();
        assert_eq!(updated.description.as_deref(), Some("now described"));
        assert_eq!(updated.tags.len(), 2);
        assert_eq!(updated.tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_update_model_not_found() {
        let registry = setup();
        let result = registry.update_model("ghost", Some("x".to_string()), None);
        assert!(matches!(result, Err(BodegaError::NotFound { .. })));
    }

    #[test]
    fn test_list_models_name_substring() {
        let registry = setup();
        registry
            .register_model("churn-weekly", None, HashMap::new())
            .unwrap();
        registry
            .register_model("churn-daily", None, HashMap::new())
            .unwrap();
        registry
            .register_model("fraud", None, HashMap::new())
            .unwrap();

        let filter = ModelFilter::new().with_name("churn");
        let models = registry.list_models(&filter).unwrap();
        assert_eq!(models.len(), 2);
        // Ordered by name.
        assert_eq!(models[0].name, "churn-daily");
        assert_eq!(models[1].name, "churn-weekly");
    }

    #[test]
    fn test_list_models_filters_are_conjunctive() {
        let registry = setup();
        registry
            .register_model("churn-a", None, tag_map(&[("env", "prod")]))
            .unwrap();
        registry
            .register_model("churn-b", None, tag_map(&[("env", "dev")]))
            .unwrap();
        registry
            .register_model("fraud", None, tag_map(&[("env", "prod")]))
            .unwrap();

        let filter = ModelFilter::new()
            .with_name("churn")
            .with_tags(tag_map(&[("env", "prod")]));
        let models = registry.list_models(&filter).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "churn-a");
    }

    #[test]
    fn test_list_models_rejects_empty_tags_filter() {
        let registry = setup();
        let filter = ModelFilter::new().with_tags(HashMap::new());
        assert!(matches!(
            registry.list_models(&filter),
            Err(BodegaError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_model_cascades_to_versions() {
        let registry = setup();
        registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version("1"))
            .unwrap();
        registry
            .register_model_version("churn", VersionRequest::new("file:///b").with_version("2"))
            .unwrap();

        registry.delete_model("churn").unwrap();

        assert!(!registry.check_model_exists("churn"));
        assert!(matches!(
            registry.get_model_version("churn", "1"),
            Err(BodegaError::NotFound { .. })
        ));
        assert!(matches!(
            registry.get_model_version("churn", "2"),
            Err(BodegaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_model_not_found() {
        let registry = setup();
        let result = registry.delete_model("ghost");
        assert!(matches!(result, Err(BodegaError::NotFound { .. })));
    }

    #[test]
    fn test_check_model_exists() {
        let registry = setup();
        assert!(!registry.check_model_exists("churn"));
        registry.register_model("churn", None, HashMap::new()).unwrap();
        assert!(registry.check_model_exists("churn"));
    }

    #[test]
    fn test_register_version_explicit() {
        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new("s3://bucket/model.pkl").with_version("7"),
            )
            .unwrap();

        let version = registry.get_model_version("churn", "7").unwrap();
        assert_eq!(version.stage, VersionStage::None);
        assert_eq!(version.model_source_uri, "s3://bucket/model.pkl");
        assert_eq!(version.reference(), "churn:7");
    }

    #[test]
    fn test_register_version_auto_creates_parent() {
        let registry = setup();
        assert!(!registry.check_model_exists("churn"));

        registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///m.bin")
                    .with_model_description("Churn family")
                    .with_model_tags(tag_map(&[("team", "growth")])),
            )
            .unwrap();

        let model = registry.get_model("churn").unwrap();
        assert_eq!(model.description.as_deref(), Some("Churn family"));
        assert_eq!(model.tags.get("team").map(String::as_str), Some("growth"));
    }

    #[test]
    fn test_register_version_existing_parent_unchanged() {
        let registry = setup();
        registry
            .register_model("churn", Some("original".to_string()), HashMap::new())
            .unwrap();

        registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///m.bin").with_model_description("ignored"),
            )
            .unwrap();

        let model = registry.get_model("churn").unwrap();
        assert_eq!(model.description.as_deref(), Some("original"));
    }

    #[test]
    fn test_register_version_allocates_sequentially() {
        let registry = setup();
        let first = registry
            .register_model_version("churn", VersionRequest::new("file:///a"))
            .unwrap();
        let second = registry
            .register_model_version("churn", VersionRequest::new("file:///b"))
            .unwrap();

        assert_eq!(first.version, "1");
        assert_eq!(second.version, "2");
    }

    #[test]
    fn test_register_version_allocation_skips_past_explicit() {
        let registry = setup();
        registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version("7"))
            .unwrap();

        let next = registry
            .register_model_version("churn", VersionRequest::new("file:///b"))
            .unwrap();
        assert_eq!(next.version, "8");
    }

    #[test]
    fn test_register_version_allocation_at_integer_ceiling_fails() {
        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///a").with_version(u64::MAX.to_string()),
            )
            .unwrap();

        // Allocation cannot go one past the ceiling; an explicit version
        // still works.
        let result = registry.register_model_version("churn", VersionRequest::new("file:///b"));
        assert!(matches!(result, Err(BodegaError::Validation(_))));

        registry
            .register_model_version("churn", VersionRequest::new("file:///b").with_version("rc-2"))
            .unwrap();
    }

    #[test]
    fn test_register_version_allocation_ignores_non_integral() {
        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///a").with_version("rc-1"),
            )
            .unwrap();

        let next = registry
            .register_model_version("churn", VersionRequest::new("file:///b"))
            .unwrap();
        assert_eq!(next.version, "1");
    }

    #[test]
    fn test_register_version_duplicate_fails() {
        let registry = setup();
        registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version("1"))
            .unwrap();

        let result = registry
            .register_model_version("churn", VersionRequest::new("file:///b").with_version("1"));
        assert!(matches!(result, Err(BodegaError::AlreadyExists { .. })));
    }

    #[test]
    fn test_register_version_empty_uri_fails() {
        let registry = setup();
        let result = registry.register_model_version("churn", VersionRequest::new(""));
        assert!(matches!(result, Err(BodegaError::Validation(_))));
    }

    #[test]
    fn test_register_version_empty_explicit_version_fails() {
        let registry = setup();
        let result = registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version(""));
        assert!(matches!(result, Err(BodegaError::Validation(_))));
    }

    #[test]
    fn test_register_version_promotes_reserved_tags() {
        let registry = setup();
        let version = registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///m.bin")
                    .with_tag("bodega_pipeline_name", "p1")
                    .with_tag("color", "red"),
            )
            .unwrap();

        assert_eq!(version.provenance.pipeline_name.as_deref(), Some("p1"));
        assert_eq!(version.tags, tag_map(&[("color", "red")]));

        // The stored record matches what was returned.
        let fetched = registry.get_model_version("churn", &version.version).unwrap();
        assert_eq!(fetched.provenance.pipeline_name.as_deref(), Some("p1"));
        assert_eq!(fetched.tags, tag_map(&[("color", "red")]));
    }

    #[test]
    fn test_register_version_keeps_registry_metadata() {
        let registry = setup();
        let version = registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///m.bin")
                    .with_registry_metadata(tag_map(&[("backend_run_id", "abc123")])),
            )
            .unwrap();

        let fetched = registry.get_model_version("churn", &version.version).unwrap();
        assert_eq!(
            fetched.registry_metadata.get("backend_run_id").map(String::as_str),
            Some("abc123")
        );
    }

    #[test]
    fn test_update_version_stage_any_to_any() {
        let registry = setup();
        registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version("1"))
            .unwrap();

        // Straight to production from none.
        registry
            .update_model_version(
                "churn",
                "1",
                VersionUpdate::new().with_stage(VersionStage::Production),
            )
            .unwrap();
        let version = registry.get_model_version("churn", "1").unwrap();
        assert_eq!(version.stage, VersionStage::Production);

        // And straight back.
        registry
            .update_model_version(
                "churn",
                "1",
                VersionUpdate::new().with_stage(VersionStage::None),
            )
            .unwrap();
        let version = registry.get_model_version("churn", "1").unwrap();
        assert_eq!(version.stage, VersionStage::None);
    }

    #[test]
    fn test_update_version_merges_tags_and_description() {
        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///a")
                    .with_version("1")
                    .with_tag("env", "dev"),
            )
            .unwrap();

        let updated = registry
            .update_model_version(
                "churn",
                "1",
                VersionUpdate::new()
                    .with_description("promoted build")
                    .with_tags(tag_map(&[("env", "prod"), ("approved", "yes")])),
            )
            .unwrap();

        assert_eq!(updated.description.as_deref(), Some("promoted build"));
        assert_eq!(updated.tags.get("env").map(String::as_str), Some("prod"));
        assert_eq!(updated.tags.get("approved").map(String::as_str), Some("yes"));
    }

    #[test]
    fn test_update_version_promotes_reserved_tags() {
        let registry = setup();
        registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version("1"))
            .unwrap();

        let updated = registry
            .update_model_version(
                "churn",
                "1",
                VersionUpdate::new().with_tags(tag_map(&[("bodega_step_name", "retrain")])),
            )
            .unwrap();

        assert!(updated.tags.is_empty());
        assert_eq!(updated.provenance.step_name.as_deref(), Some("retrain"));
    }

    #[test]
    fn test_update_version_not_found() {
        let registry = setup();
        let result = registry.update_model_version("churn", "9", VersionUpdate::new());
        assert!(matches!(result, Err(BodegaError::NotFound { .. })));
    }

    #[test]
    fn test_delete_version() {
        let registry = setup();
        registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version("1"))
            .unwrap();

        registry.delete_model_version("churn", "1").unwrap();
        assert!(!registry.check_model_version_exists("churn", "1"));

        // The registration itself survives.
        assert!(registry.check_model_exists("churn"));

        let result = registry.delete_model_version("churn", "1");
        assert!(matches!(result, Err(BodegaError::NotFound { .. })));
    }

    #[test]
    fn test_list_versions_by_name_and_tags() {
        let registry = setup();
        registry
            .register_model_version(
                "m",
                VersionRequest::new("file:///a")
                    .with_version("1")
                    .with_tag("env", "prod"),
            )
            .unwrap();
        registry
            .register_model_version(
                "m",
                VersionRequest::new("file:///b")
                    .with_version("2")
                    .with_tag("env", "dev"),
            )
            .unwrap();
        registry
            .register_model_version(
                "other",
                VersionRequest::new("file:///c")
                    .with_version("1")
                    .with_tag("env", "prod"),
            )
            .unwrap();

        let filter = VersionFilter::new()
            .with_name("m")
            .with_tags(tag_map(&[("env", "prod")]));
        let versions = registry.list_model_versions(&filter).unwrap();

        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].name, "m");
        assert_eq!(versions[0].version, "1");
    }

    #[test]
    fn test_list_versions_name_is_exact() {
        let registry = setup();
        registry
            .register_model_version("churn", VersionRequest::new("file:///a"))
            .unwrap();
        registry
            .register_model_version("churn-v2", VersionRequest::new("file:///b"))
            .unwrap();

        let versions = registry
            .list_model_versions(&VersionFilter::new().with_name("churn"))
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].name, "churn");
    }

    #[test]
    fn test_list_versions_by_source_uri() {
        let registry = setup();
        registry
            .register_model_version("a", VersionRequest::new("file:///shared"))
            .unwrap();
        registry
            .register_model_version("b", VersionRequest::new("file:///shared"))
            .unwrap();
        registry
            .register_model_version("c", VersionRequest::new("file:///other"))
            .unwrap();

        let versions = registry
            .list_model_versions(&VersionFilter::new().with_source_uri("file:///shared"))
            .unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn test_list_versions_unfiltered_returns_all() {
        let registry = setup();
        registry
            .register_model_version("a", VersionRequest::new("file:///1"))
            .unwrap();
        registry
            .register_model_version("b", VersionRequest::new("file:///2"))
            .unwrap();

        let versions = registry
            .list_model_versions(&VersionFilter::new())
            .unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn test_load_model_version_roundtrip() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("model.bin");
        std::fs::write(&artifact, b"serialized weights").unwrap();

        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new(format!("file://{}", artifact.display())).with_version("1"),
            )
            .unwrap();

        let bytes = registry.load_model_version("churn", "1").unwrap();
        assert_eq!(bytes, b"serialized weights");
    }

    #[test]
    fn test_load_model_version_missing_artifact_is_load_error() {
        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///nonexistent/model.bin").with_version("1"),
            )
            .unwrap();

        let result = registry.load_model_version("churn", "1");
        assert!(matches!(result, Err(BodegaError::Load { .. })));
    }

    #[test]
    fn test_load_model_version_unknown_is_not_found() {
        let registry = setup();
        let result = registry.load_model_version("churn", "1");
        assert!(matches!(result, Err(BodegaError::NotFound { .. })));
    }

    #[test]
    fn test_version_timestamps_advance_on_update() {
        let registry = setup();
        let created = registry
            .register_model_version("churn", VersionRequest::new("file:///a").with_version("1"))
            .unwrap();

        let updated = registry
            .update_model_version(
                "churn",
                "1",
                VersionUpdate::new().with_stage(VersionStage::Staging),
            )
            .unwrap();

        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.last_updated_at >= created.last_updated_at);
    }
}
