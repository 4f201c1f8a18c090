use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

use wiki_abstract_extractor::{
    config::{Configuration, OutputFormat, RunMode},
    dump::list_dumps,
    knowledge_graph::KnowledgeGraph,
    pipeline::{run_all, Pipeline, RunSummary},
};

#[derive(Parser)]
#[command(
    name = "wiki_abstract_extractor",
    about = "Extract abstracts from MediaWiki dumps and attach them to an existing knowledge graph",
    long_about = None,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(clap::Args, Clone)]
struct Overrides {
    /// Configuration file path (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Knowledge graph root, one subfolder per wiki
    #[arg(long)]
    graph_root: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormatArg>,

    /// Keep pages whose subject is not in the knowledge graph
    #[arg(long)]
    no_filter: bool,

    /// Write the run summary as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline as the configuration's run mode says
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Extract abstracts from a single dump
    Extract {
        #[command(flatten)]
        overrides: Overrides,

        /// Dump file (defaults to the configured dump)
        #[arg(long)]
        dump: Option<PathBuf>,
    },

    /// Extract abstracts from every dump in a directory
    ExtractAll {
        #[command(flatten)]
        overrides: Overrides,

        /// Dump directory (defaults to the configured one)
        #[arg(long)]
        dump_dir: Option<PathBuf>,

        /// Number of dumps processed at once
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Load a knowledge graph folder and show statistics
    GraphStats {
        /// Folder of Turtle files
        #[arg(short, long)]
        folder: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Generate example configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long)]
        output: PathBuf,

        /// Configuration format (yaml or json)
        #[arg(short, long, default_value = "yaml")]
        format: ConfigFormat,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum OutputFormatArg {
    Csv,
    Turtle,
    NTriples,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(format: OutputFormatArg) -> Self {
        match format {
            OutputFormatArg::Csv => Self::Csv,
            OutputFormatArg::Turtle => Self::Turtle,
            OutputFormatArg::NTriples => Self::NTriples,
        }
    }
}

#[derive(clap::ValueEnum, Clone)]
enum ConfigFormat {
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { overrides } => {
            let config = load_config(&overrides)?;
            let summary = match config.run_mode {
                RunMode::SingleDump => extract_command(config, None)?,
                RunMode::MultiDump => extract_all_command(config, None, None).await?,
            };
            print_summary(&summary, overrides.report.as_deref())
        }
        Commands::Extract { overrides, dump } => {
            let mut config = load_config(&overrides)?;
            config.run_mode = RunMode::SingleDump;
            let summary = extract_command(config, dump)?;
            print_summary(&summary, overrides.report.as_deref())
        }
        Commands::ExtractAll { overrides, dump_dir, workers } => {
            let mut config = load_config(&overrides)?;
            config.run_mode = RunMode::MultiDump;
            let summary = extract_all_command(config, dump_dir, workers).await?;
            print_summary(&summary, overrides.report.as_deref())
        }
        Commands::GraphStats { folder } => graph_stats_command(folder),
        Commands::Validate { config } => validate_command(config),
        Commands::GenerateConfig { output, format } => {
            generate_config_command(output, format).await
        }
    }
}

fn load_config(overrides: &Overrides) -> Result<Configuration> {
    let mut config = match &overrides.config {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::default(),
    };

    if let Some(root) = &overrides.graph_root {
        config.paths.graph_root = root.clone();
    }
    if let Some(format) = overrides.format {
        config.output_format = format.into();
    }
    if overrides.no_filter {
        config.filter_by_graph = false;
    }

    config.validate()?;
    Ok(config)
}

fn extract_command(mut config: Configuration, dump: Option<PathBuf>) -> Result<RunSummary> {
    println!("{}", "Starting abstract extraction...".bright_blue().bold());

    if let Some(dump) = dump {
        config.paths.dump_dir = dump.parent().map(PathBuf::from).unwrap_or_default();
        config.paths.dump_file = dump
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("Not a dump file: {}", dump.display()))?;
    }

    println!(" Configuration: {}", config.name.bright_green());
    println!(" Dump: {}", config.paths.dump_dir.join(&config.paths.dump_file).display());

    let pipeline = Pipeline::new(config)?;
    Ok(pipeline.run_single())
}

async fn extract_all_command(
    mut config: Configuration,
    dump_dir: Option<PathBuf>,
    workers: Option<usize>,
) -> Result<RunSummary> {
    println!("{}", "Starting multi-dump abstract extraction...".bright_blue().bold());

    if let Some(dir) = dump_dir {
        config.paths.dump_dir = dir;
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }

    let dumps = list_dumps(&config.paths.dump_dir)?;
    println!(" Configuration: {}", config.name.bright_green());
    println!(" Dumps: {}", dumps.len());
    println!(" Workers: {}", config.workers);

    let progress = ProgressBar::new(dumps.len() as u64);
    progress.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")?);

    let pipeline = Arc::new(Pipeline::new(config)?);
    let summary = run_all(pipeline, dumps, |report| {
        progress.set_message(report.wiki.clone());
        progress.inc(1);
    })
    .await;
    progress.finish_and_clear();

    Ok(summary)
}

fn print_summary(summary: &RunSummary, report_path: Option<&Path>) -> Result<()> {
    for report in &summary.reports {
        let started = report.started_at.format("%Y-%m-%d %H:%M:%S");
        match (&report.error, &report.output) {
            (Some(err), _) => {
                error!(" {} failed: {}", report.dump.display(), err);
                println!(" {} {} [{} started {}]", "✗".bright_red(), report.dump.display(), report.id, started);
            }
            (None, Some(output)) => {
                println!(
                    " {} {} → {} ({} abstracts, {} skipped, {} errors, {:.2}s) [{} started {}]",
                    "✓".bright_green(),
                    report.wiki,
                    output.display().to_string().bright_green(),
                    report.abstracts_emitted.to_string().bright_cyan(),
                    report.pages_skipped,
                    report.page_errors,
                    report.processing_time_seconds,
                    report.id,
                    started
                );
            }
            (None, None) => {}
        }
    }

    println!("\n{}", " Extraction Summary".bright_green().bold());
    println!(" Dumps succeeded: {}", summary.succeeded.to_string().bright_cyan());
    println!(" Dumps failed: {}", summary.failed);
    println!(" Total abstracts: {}", summary.total_abstracts().to_string().bright_cyan());

    if summary.failed > 0 || summary.total_page_errors() > 0 {
        println!(" {} completed with some errors", "Extraction".bright_yellow());
    } else {
        println!(" {} completed successfully!", "Extraction".bright_green());
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(summary)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report: {}", path.display()))?;
        println!(" Run report: {}", path.display().to_string().bright_green());
    }

    if summary.succeeded == 0 && summary.failed > 0 {
        anyhow::bail!("No dump was processed successfully");
    }

    Ok(())
}

fn graph_stats_command(folder: PathBuf) -> Result<()> {
    println!("{}", " Knowledge Graph Statistics".bright_blue().bold());

    let graph = KnowledgeGraph::load_folder(&folder)?;
    println!("{}", graph.get_statistics());

    Ok(())
}

fn validate_command(config_path: PathBuf) -> Result<()> {
    println!("{}", " Validating configuration...".bright_blue().bold());

    let config = Configuration::from_file(&config_path).map_err(|e| {
        error!(" Failed to load configuration: {}", e);
        e
    })?;

    match config.validate() {
        Ok(()) => {
            println!(" Configuration is valid!");
            println!(" Name: {}", config.name.bright_green());
            println!(" Output format: {:?}", config.output_format);
            println!(" Run mode: {:?}", config.run_mode);
            println!(" Ontology: {}", config.rdf_schema.namespace);
            println!(" Workers: {}", config.workers);
            Ok(())
        }
        Err(e) => {
            error!(" Configuration validation failed: {}", e);
            Err(e)
        }
    }
}

async fn generate_config_command(output_path: PathBuf, format: ConfigFormat) -> Result<()> {
    println!("{}", " Generating example configuration...".bright_blue().bold());

    let config = Configuration::example();

    let content = match format {
        ConfigFormat::Yaml => serde_yaml::to_string(&config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(&config)?,
    };

    tokio::fs::write(&output_path, content).await?;

    println!(" Example configuration generated at: {}", output_path.display().to_string().bright_green());
    println!(" Edit the file to customize for your use case");

    Ok(())
}
