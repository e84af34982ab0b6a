//! Bodega CLI - Model Registry with a Staged Version Lifecycle

use bodega::cli;
use bodega::prelude::*;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bodega")]
#[command(author, version, about = "Model registry with a staged version lifecycle", long_about = None)]
struct Cli {
    /// Registry path (default: ~/.bodega)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Model registration operations
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Model version operations
    Version {
        #[command(subcommand)]
        action: VersionAction,
    },
    /// Show registry statistics
    Stats,
    /// Initialize a new registry
    Init,
}

#[derive(Subcommand)]
enum ModelAction {
    /// Register a new model
    Register {
        /// Model name
        name: String,
        /// Model description
        #[arg(long, short)]
        description: Option<String>,
        /// Model tag, repeatable
        #[arg(long = "tag", short, value_parser = cli::parse_key_val, value_name = "KEY=VALUE")]
        tags: Vec<(String, String)>,
    },
    /// Update a model's description or tags
    Update {
        /// Model name
        name: String,
        /// New description
        #[arg(long, short)]
        description: Option<String>,
        /// Tag to merge, repeatable
        #[arg(long = "tag", short, value_parser = cli::parse_key_val, value_name = "KEY=VALUE")]
        tags: Vec<(String, String)>,
    },
    /// Get model details
    Get {
        /// Model name
        name: String,
    },
    /// List models
    List {
        /// Name substring to match
        #[arg(long, short)]
        name: Option<String>,
        /// Required tag, repeatable
        #[arg(long = "tag", short, value_parser = cli::parse_key_val, value_name = "KEY=VALUE")]
        tags: Vec<(String, String)>,
    },
    /// Delete a model and every version it owns
    Delete {
        /// Model name
        name: String,
    },
}

#[derive(Subcommand)]
enum VersionAction {
    /// Register a model version
    Register {
        /// Model name
        model: String,
        /// Artifact source URI (e.g. file:///path/to/model.bin)
        source_uri: String,
        /// Explicit version identifier (allocated when omitted)
        #[arg(long, short)]
        version: Option<String>,
        /// Version description
        #[arg(long, short)]
        description: Option<String>,
        /// Version tag, repeatable
        #[arg(long = "tag", short, value_parser = cli::parse_key_val, value_name = "KEY=VALUE")]
        tags: Vec<(String, String)>,
        /// Backend metadata pair, repeatable
        #[arg(long = "meta", value_parser = cli::parse_key_val, value_name = "KEY=VALUE")]
        metadata: Vec<(String, String)>,
        /// Pipeline that produced this version
        #[arg(long)]
        pipeline_name: Option<String>,
        /// Pipeline run that produced this version
        #[arg(long)]
        run_id: Option<String>,
        /// Pipeline step that produced this version
        #[arg(long)]
        step_name: Option<String>,
        /// Description for the model if this call creates it
        #[arg(long)]
        model_description: Option<String>,
    },
    /// Update a version's description, tags, or stage
    Update {
        /// Model name
        model: String,
        /// Version identifier
        version: String,
        /// New description
        #[arg(long, short)]
        description: Option<String>,
        /// Tag to merge, repeatable
        #[arg(long = "tag", short, value_parser = cli::parse_key_val, value_name = "KEY=VALUE")]
        tags: Vec<(String, String)>,
        /// Target stage (none, staging, production, archived)
        #[arg(long, short)]
        stage: Option<String>,
    },
    /// Get version details
    Get {
        /// Model name
        model: String,
        /// Version identifier
        version: String,
    },
    /// List versions
    List {
        /// Exact model name
        #[arg(long, short)]
        model: Option<String>,
        /// Exact artifact source URI
        #[arg(long)]
        source_uri: Option<String>,
        /// Required tag, repeatable
        #[arg(long = "tag", short, value_parser = cli::parse_key_val, value_name = "KEY=VALUE")]
        tags: Vec<(String, String)>,
    },
    /// Delete a version
    Delete {
        /// Model name
        model: String,
        /// Version identifier
        version: String,
    },
    /// Load a version's artifact into a file
    Load {
        /// Model name
        model: String,
        /// Version identifier
        version: String,
        /// Output path
        #[arg(long, short)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    // Tests may install a subscriber first; keep whichever won.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn run(cli: Cli) -> bodega::Result<()> {
    let config = resolve_config(cli.registry)?;

    match cli.command {
        Commands::Init => {
            std::fs::create_dir_all(&config.base_path)?;
            config.save()?;
            FlavorRegistry::with_defaults().create(&config)?;
            println!("Registry initialized at: {}", config.base_path.display());
        }
        Commands::Stats => {
            let registry = open_registry(&config)?;
            let stats = cli::collect_stats(registry.as_ref())?;
            print!("{}", cli::format_stats(&stats));
        }
        Commands::Model { action } => handle_model(&config, action)?,
        Commands::Version { action } => handle_version(&config, action)?,
    }

    Ok(())
}

/// Resolve the effective configuration: an explicit `--registry` path or
/// the default location, refined by a saved `config.toml` when one exists.
fn resolve_config(registry: Option<PathBuf>) -> bodega::Result<RegistryConfig> {
    let config = registry.map(RegistryConfig::new).unwrap_or_default();
    if config.config_path().exists() {
        return RegistryConfig::load(config.config_path());
    }
    Ok(config)
}

fn open_registry(config: &RegistryConfig) -> bodega::Result<Box<dyn ModelRegistry>> {
    FlavorRegistry::with_defaults().create(config)
}

fn handle_model(config: &RegistryConfig, action: ModelAction) -> bodega::Result<()> {
    let registry = open_registry(config)?;
    let registry = registry.as_ref();

    match action {
        ModelAction::Register {
            name,
            description,
            tags,
        } => {
            let model = registry.register_model(&name, description, tags.into_iter().collect())?;
            println!("Registered model: {}", model.name);
        }
        ModelAction::Update {
            name,
            description,
            tags,
        } => {
            let tags = if tags.is_empty() {
                None
            } else {
                Some(tags.into_iter().collect())
            };
            let model = registry.update_model(&name, description, tags)?;
            println!("Updated model: {}", model.name);
        }
        ModelAction::Get { name } => {
            let model = registry.get_model(&name)?;
            print!("{}", cli::format_model_info(&model));
        }
        ModelAction::List { name, tags } => {
            let mut filter = ModelFilter::new();
            if let Some(name) = name {
                filter = filter.with_name(name);
            }
            if !tags.is_empty() {
                filter = filter.with_tags(tags.into_iter().collect());
            }
            let models = registry.list_models(&filter)?;
            if models.is_empty() {
                println!("No models found.");
            } else {
                println!("Models:");
                for model in &models {
                    println!("  {}", cli::format_model_line(model));
                }
            }
        }
        ModelAction::Delete { name } => {
            registry.delete_model(&name)?;
            println!("Deleted model: {name}");
        }
    }

    Ok(())
}

fn handle_version(config: &RegistryConfig, action: VersionAction) -> bodega::Result<()> {
    let registry = open_registry(config)?;
    let registry = registry.as_ref();

    match action {
        VersionAction::Register {
            model,
            source_uri,
            version,
            description,
            tags,
            metadata,
            pipeline_name,
            run_id,
            step_name,
            model_description,
        } => {
            let mut provenance =
                RunProvenance::new().with_framework_version(env!("CARGO_PKG_VERSION"));
            if let Some(pipeline_name) = pipeline_name {
                provenance = provenance.with_pipeline_name(pipeline_name);
            }
            if let Some(run_id) = run_id {
                provenance = provenance.with_pipeline_run_id(run_id);
            }
            if let Some(step_name) = step_name {
                provenance = provenance.with_step_name(step_name);
            }
            let mut request = VersionRequest::new(source_uri)
                .with_tags(tags.into_iter().collect())
                .with_registry_metadata(metadata.into_iter().collect())
                .with_provenance(provenance);
            if let Some(version) = version {
                request = request.with_version(version);
            }
            if let Some(description) = description {
                request = request.with_description(description);
            }
            if let Some(model_description) = model_description {
                request = request.with_model_description(model_description);
            }

            let record = registry.register_model_version(&model, request)?;
            println!("Registered version: {}", record.reference());
        }
        VersionAction::Update {
            model,
            version,
            description,
            tags,
            stage,
        } => {
            let mut update = VersionUpdate::new();
            if let Some(description) = description {
                update = update.with_description(description);
            }
            if !tags.is_empty() {
                update = update.with_tags(tags.into_iter().collect());
            }
            if let Some(stage) = stage {
                update = update.with_stage(stage.parse()?);
            }

            let record = registry.update_model_version(&model, &version, update)?;
            println!("Updated version: {} [{}]", record.reference(), record.stage);
        }
        VersionAction::Get { model, version } => {
            let record = registry.get_model_version(&model, &version)?;
            print!("{}", cli::format_version_info(&record));
        }
        VersionAction::List {
            model,
            source_uri,
            tags,
        } => {
            let mut filter = VersionFilter::new();
            if let Some(model) = model {
                filter = filter.with_name(model);
            }
            if let Some(uri) = source_uri {
                filter = filter.with_source_uri(uri);
            }
            if !tags.is_empty() {
                filter = filter.with_tags(tags.into_iter().collect());
            }
            let versions = registry.list_model_versions(&filter)?;
            if versions.is_empty() {
                println!("No versions found.");
            } else {
                println!("Versions:");
                for record in &versions {
                    println!("  {}", cli::format_version_line(record));
                }
            }
        }
        VersionAction::Delete { model, version } => {
            registry.delete_model_version(&model, &version)?;
            println!("Deleted version: {model}:{version}");
        }
        VersionAction::Load {
            model,
            version,
            output,
        } => {
            let message = cli::handle_load(registry, &model, &version, &output)?;
            println!("{message}");
        }
    }

    Ok(())
}
