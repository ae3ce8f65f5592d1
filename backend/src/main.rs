//! Dataprep CLI - run declarative data-preparation presets
//!
//! # Main Commands
//!
//! ```bash
//! dataprep serve                       # Start HTTP server (port 3000)
//! dataprep run cart-products           # Run a catalog preset
//! dataprep run-file preset.json        # Run a standalone preset document
//! dataprep preset list                 # Inspect the catalog
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! dataprep flatten payload.json --root-key carts --record-path products --meta userId
//! dataprep steps                       # Show available step types
//! ```

use clap::{Parser, Subcommand};
use dataprep::{
    flatten, steps_description, AppConfig, DefaultFetcher, PipelineRunner, Preset,
    PresetCatalog, Record, RecordPath, ShapeHints,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "dataprep")]
#[command(about = "Run declarative data-preparation pipelines", long_about = None)]
struct Cli {
    /// Catalog directory (overrides DATAPREP_CATALOG_DIR)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides DATAPREP_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a catalog preset and print its records
    Run {
        /// Preset slug
        slug: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a self-contained preset document ({name, source, steps})
    RunFile {
        /// Preset JSON file
        preset: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Flatten a local JSON payload
    Flatten {
        /// Input JSON file
        input: PathBuf,

        /// Key holding the data list
        #[arg(long)]
        root_key: Option<String>,

        /// Comma-separated path to the nested record list
        #[arg(long, value_delimiter = ',')]
        record_path: Vec<String>,

        /// Comma-separated fields copied onto every record
        #[arg(long, value_delimiter = ',')]
        meta: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show available transformation steps
    Steps,

    /// Inspect catalog presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// List all presets
    List,

    /// Show one preset with its source and steps
    Show {
        /// Preset slug
        slug: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match load_config(cli.catalog) {
        Ok(config) => match cli.command {
            Commands::Serve { port } => cmd_serve(config.with_port(port)).await,
            Commands::Run { slug, output } => cmd_run(&config, &slug, output.as_deref()).await,
            Commands::RunFile { preset, output } => {
                cmd_run_file(&config, &preset, output.as_deref()).await
            }
            Commands::Flatten {
                input,
                root_key,
                record_path,
                meta,
                output,
            } => cmd_flatten(&input, root_key, record_path, meta, output.as_deref()),
            Commands::Steps => cmd_steps(),
            Commands::Preset { action } => cmd_preset(&config, action),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(catalog: Option<PathBuf>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::from_env()?.with_catalog_dir(catalog))
}

fn open_catalog(config: &AppConfig) -> Result<PresetCatalog, Box<dyn std::error::Error>> {
    Ok(PresetCatalog::open(&config.catalog_dir)?.with_fallback_owner(config.fallback_owner.clone()))
}

async fn cmd_serve(config: AppConfig) -> CliResult {
    dataprep::server::start_server(config).await?;
    Ok(())
}

async fn cmd_run(config: &AppConfig, slug: &str, output: Option<&Path>) -> CliResult {
    let catalog = open_catalog(config)?;
    let preset = catalog.resolve(slug)?;

    let runner = PipelineRunner::new(DefaultFetcher::with_settings(config.fetch_timeout, catalog.root())?);
    let records = runner.run(&preset).await?;

    write_records(&records, output)
}

async fn cmd_run_file(config: &AppConfig, path: &Path, output: Option<&Path>) -> CliResult {
    let content = fs::read_to_string(path)?;
    let preset: Preset = serde_json::from_str(&content)?;

    // file sources inside the document resolve next to it
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let runner = PipelineRunner::new(DefaultFetcher::with_settings(config.fetch_timeout, base_dir)?);
    let records = runner.run(&preset).await?;

    write_records(&records, output)
}

fn cmd_flatten(
    input: &Path,
    root_key: Option<String>,
    record_path: Vec<String>,
    meta: Vec<String>,
    output: Option<&Path>,
) -> CliResult {
    let content = fs::read_to_string(input)?;
    let payload: Value = serde_json::from_str(&content)?;

    let hints = ShapeHints {
        root_key,
        record_path: (!record_path.is_empty()).then(|| RecordPath::Path(record_path)),
        meta_fields: (!meta.is_empty()).then_some(meta),
    };

    let table = flatten(&payload, &hints)?;
    eprintln!("📋 {}", table.shape());
    if !table.is_empty() {
        eprintln!("   Columns: {}", table.columns().join(", "));
    }

    write_records(&table.into_records(), output)
}

fn cmd_steps() -> CliResult {
    println!("{}", steps_description());
    Ok(())
}

fn cmd_preset(config: &AppConfig, action: PresetAction) -> CliResult {
    let catalog = open_catalog(config)?;

    match action {
        PresetAction::List => {
            let presets = catalog.list();
            if presets.is_empty() {
                eprintln!("📋 No presets in {}", catalog.root().display());
                return Ok(());
            }

            eprintln!("📋 Presets ({}):\n", presets.len());
            for p in presets {
                println!("  📄 {} ({})", p.name, p.slug);
                if !p.description.is_empty() {
                    println!("     {}", p.description);
                }
                println!("     Source: {}", p.source.as_deref().unwrap_or("none"));
                println!("     Steps: {}", p.step_count);
                if let Some(owner) = p.owner {
                    println!("     Owner: {}", owner);
                }
                println!();
            }
        }

        PresetAction::Show { slug } => {
            let preset = catalog.resolve(&slug)?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
    }

    Ok(())
}

fn write_records(records: &[Record], path: Option<&Path>) -> CliResult {
    let json = serde_json::to_string_pretty(records)?;
    match path {
        Some(p) => {
            fs::write(p, json)?;
            eprintln!("💾 {} records written to: {}", records.len(), p.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
