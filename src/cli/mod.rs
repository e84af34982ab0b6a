//! CLI command handlers.
//!
//! This module contains the business logic for CLI commands,
//! separated from argument parsing for testability.

use crate::error::Result;
use crate::model::{ModelRegistration, ModelVersion, VersionStage};
use crate::registry::{ModelFilter, ModelRegistry, VersionFilter};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

/// Parse a `KEY=VALUE` command-line pair.
///
/// # Errors
///
/// Returns a message suitable for clap when the pair is malformed.
pub fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn sorted_pairs(map: &HashMap<String, String>) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = map
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    pairs.sort_unstable();
    pairs
}

/// Format registration details for display.
#[must_use]
pub fn format_model_info(model: &ModelRegistration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model: {}", model.name);
    let _ = writeln!(out, "  Created: {}", model.created_at);
    let _ = writeln!(out, "  Updated: {}", model.last_updated_at);
    if let Some(description) = &model.description {
        let _ = writeln!(out, "  Description: {description}");
    }
    if !model.tags.is_empty() {
        out.push_str("  Tags:\n");
        for (k, v) in sorted_pairs(&model.tags) {
            let _ = writeln!(out, "    {k}: {v}");
        }
    }
    out
}

/// Format a registration as a one-line listing entry.
#[must_use]
pub fn format_model_line(model: &ModelRegistration) -> String {
    match &model.description {
        Some(description) => format!("{} - {description}", model.name),
        None => model.name.clone(),
    }
}

/// Format version details for display.
#[must_use]
pub fn format_version_info(version: &ModelVersion) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Version: {}", version.reference());
    let _ = writeln!(out, "  Source:  {}", version.model_source_uri);
    let _ = writeln!(out, "  Stage:   {}", version.stage);
    let _ = writeln!(out, "  Created: {}", version.created_at);
    let _ = writeln!(out, "  Updated: {}", version.last_updated_at);
    if let Some(description) = &version.description {
        let _ = writeln!(out, "  Description: {description}");
    }
    if !version.tags.is_empty() {
        out.push_str("  Tags:\n");
        for (k, v) in sorted_pairs(&version.tags) {
            let _ = writeln!(out, "    {k}: {v}");
        }
    }
    if !version.registry_metadata.is_empty() {
        out.push_str("  Metadata:\n");
        for (k, v) in sorted_pairs(&version.registry_metadata) {
            let _ = writeln!(out, "    {k}: {v}");
        }
    }
    if !version.provenance.is_empty() {
        out.push_str("  Provenance:\n");
        if let Some(pipeline) = &version.provenance.pipeline_name {
            let _ = writeln!(out, "    Pipeline:  {pipeline}");
        }
        if let Some(run_id) = &version.provenance.pipeline_run_id {
            let _ = writeln!(out, "    Run:       {run_id}");
        }
        if let Some(step) = &version.provenance.step_name {
            let _ = writeln!(out, "    Step:      {step}");
        }
        if let Some(framework) = &version.provenance.framework_version {
            let _ = writeln!(out, "    Framework: {framework}");
        }
    }
    out
}

/// Format a version as a one-line listing entry.
#[must_use]
pub fn format_version_line(version: &ModelVersion) -> String {
    format!(
        "{} [{}] {}",
        version.reference(),
        version.stage,
        version.model_source_uri
    )
}

/// Registry-wide counts shown by `stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub model_count: usize,
    pub version_count: usize,
    pub staging_count: usize,
    pub production_count: usize,
    pub archived_count: usize,
}

/// Count registrations and versions per lifecycle stage.
///
/// # Errors
///
/// Returns an error if the registry cannot be listed.
pub fn collect_stats(registry: &dyn ModelRegistry) -> Result<RegistryStats> {
    let models = registry.list_models(&ModelFilter::new())?;
    let versions = registry.list_model_versions(&VersionFilter::new())?;
    let in_stage =
        |stage: VersionStage| versions.iter().filter(|v| v.stage == stage).count();

    Ok(RegistryStats {
        model_count: models.len(),
        version_count: versions.len(),
        staging_count: in_stage(VersionStage::Staging),
        production_count: in_stage(VersionStage::Production),
        archived_count: in_stage(VersionStage::Archived),
    })
}

/// Format registry stats for display.
#[must_use]
pub fn format_stats(stats: &RegistryStats) -> String {
    let mut out = String::new();
    out.push_str("Registry Statistics:\n");
    let _ = writeln!(out, "  Models:     {}", stats.model_count);
    let _ = writeln!(out, "  Versions:   {}", stats.version_count);
    let _ = writeln!(out, "  Staging:    {}", stats.staging_count);
    let _ = writeln!(out, "  Production: {}", stats.production_count);
    let _ = writeln!(out, "  Archived:   {}", stats.archived_count);
    out
}

/// Load a version's artifact and write it to `output`.
///
/// # Errors
///
/// Returns an error if the version is unknown, the artifact cannot be
/// read, or the output file cannot be written.
pub fn handle_load(
    registry: &dyn ModelRegistry,
    name: &str,
    version: &str,
    output: &Path,
) -> Result<String> {
    let bytes = registry.load_model_version(name, version)?;
    std::fs::write(output, &bytes)?;
    Ok(format!(
        "Wrote {} bytes from {name}:{version} to {}",
        bytes.len(),
        output.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SqliteRegistry, VersionRequest, VersionUpdate};
    use tempfile::TempDir;

    fn setup() -> SqliteRegistry {
        SqliteRegistry::in_memory().unwrap()
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("env=prod"),
            Ok(("env".to_string(), "prod".to_string()))
        );
        assert_eq!(
            parse_key_val("note=a=b"),
            Ok(("note".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_val("justakey").is_err());
        assert!(parse_key_val("=value").is_err());
    }

    #[test]
    fn test_format_model_info() {
        let registry = setup();
        let model = registry
            .register_model(
                "churn",
                Some("Churn prediction".to_string()),
                HashMap::from([("team".to_string(), "growth".to_string())]),
            )
            .unwrap();

        let out = format_model_info(&model);
        assert!(out.contains("Model: churn"));
        assert!(out.contains("Description: Churn prediction"));
        assert!(out.contains("team: growth"));
    }

    #[test]
    fn test_format_model_line() {
        let registry = setup();
        let bare = registry.register_model("a", None, HashMap::new()).unwrap();
        let described = registry
            .register_model("b", Some("desc".to_string()), HashMap::new())
            .unwrap();

        assert_eq!(format_model_line(&bare), "a");
        assert_eq!(format_model_line(&described), "b - desc");
    }

    #[test]
    fn test_format_version_info() {
        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new("file:///m.bin")
                    .with_version("3")
                    .with_tag("env", "prod")
                    .with_tag("bodega_pipeline_name", "train-weekly"),
            )
            .unwrap();
        let version = registry
            .update_model_version(
                "churn",
                "3",
                VersionUpdate::new().with_stage(VersionStage::Production),
            )
            .unwrap();

        let out = format_version_info(&version);
        assert!(out.contains("Version: churn:3"));
        assert!(out.contains("Stage:   production"));
        assert!(out.contains("Source:  file:///m.bin"));
        assert!(out.contains("env: prod"));
        assert!(out.contains("Pipeline:  train-weekly"));
        // Promoted keys never show up as tags.
        assert!(!out.contains("bodega_pipeline_name"));
    }

    #[test]
    fn test_format_version_line() {
        let registry = setup();
        let version = registry
            .register_model_version("churn", VersionRequest::new("file:///m.bin"))
            .unwrap();

        assert_eq!(format_version_line(&version), "churn:1 [none] file:///m.bin");
    }

    #[test]
    fn test_collect_stats() {
        let registry = setup();
        registry
            .register_model_version("a", VersionRequest::new("file:///1"))
            .unwrap();
        registry
            .register_model_version("a", VersionRequest::new("file:///2"))
            .unwrap();
        registry
            .register_model_version("b", VersionRequest::new("file:///3"))
            .unwrap();
        registry
            .update_model_version(
                "a",
                "2",
                VersionUpdate::new().with_stage(VersionStage::Production),
            )
            .unwrap();

        let stats = collect_stats(&registry).unwrap();
        assert_eq!(stats.model_count, 2);
        assert_eq!(stats.version_count, 3);
        assert_eq!(stats.production_count, 1);
        assert_eq!(stats.staging_count, 0);
    }

    #[test]
    fn test_format_stats() {
        let stats = RegistryStats {
            model_count: 5,
            version_count: 12,
            staging_count: 2,
            production_count: 3,
            archived_count: 1,
        };
        let out = format_stats(&stats);
        assert!(out.contains("Models:     5"));
        assert!(out.contains("Versions:   12"));
        assert!(out.contains("Production: 3"));
    }

    #[test]
    fn test_handle_load_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("model.bin");
        std::fs::write(&artifact, b"weights").unwrap();

        let registry = setup();
        registry
            .register_model_version(
                "churn",
                VersionRequest::new(format!("file://{}", artifact.display())).with_version("1"),
            )
            .unwrap();

        let output = dir.path().join("out.bin");
        let message = handle_load(&registry, "churn", "1", &output).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"weights");
        assert!(message.contains("7 bytes"));
        assert!(message.contains("churn:1"));
    }

    #[test]
    fn test_handle_load_unknown_version() {
        let dir = TempDir::new().unwrap();
        let registry = setup();
        let result = handle_load(&registry, "ghost", "1", &dir.path().join("out"));
        assert!(result.is_err());
    }
}
