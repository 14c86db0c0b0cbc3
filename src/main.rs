// QRQC assistant
// Main entry point

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use qrqc::cli::{format_summary, save_report, Repl};
use qrqc::config::{fetch_document, load_config, load_config_from, AssetLoader, Config};
use qrqc::conversation::{parse_transcript, ConversationEngine};
use qrqc::metrics::UsageLogger;
use qrqc::report::ReportTemplate;
use qrqc::transport::{create_transport, GatedTransport, QuotaGate};

#[derive(Parser)]
#[command(name = "qrqc")]
#[command(version, about = "Guided QRQC problem analysis with a PDF report", long_about = None)]
struct Cli {
    /// Config file (default: $QRQC_CONFIG or ~/.qrqc/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new analysis (default)
    Analyze {
        /// Problem statement; asked interactively when omitted
        #[arg(short, long)]
        problem: Option<String>,
    },
    /// Continue a discussion exported with /export
    Resume {
        /// discussion_<timestamp>.txt file
        file: PathBuf,
    },
    /// Render report data (JSON) to PDF without talking to the assistant
    Render {
        /// Report data as produced by the assistant
        #[arg(long)]
        data: PathBuf,
        /// Exported discussion for the transcript appendix
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Layout template (default: assets.template_url)
        #[arg(long)]
        template: Option<String>,
        /// Output directory (default: output.directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Usage statistics from the local log
    Stats {
        #[arg(long, default_value_t = 30)]
        days: u32,
        /// Also delete log files older than this many days
        #[arg(long)]
        prune: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Analyze { problem: None });
    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        // Offline commands have no use for the API key
        Err(e) if command.is_offline() => {
            tracing::debug!("{:#}; using default settings", e);
            Config::default()
        }
        Err(e) => return Err(e),
    };

    match command {
        Commands::Analyze { problem } => {
            let mut repl = build_repl(&config).await?;
            repl.run(problem).await?;
        }
        Commands::Resume { file } => {
            let saved = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read discussion: {}", file.display()))?;
            let mut repl = build_repl(&config).await?;
            repl.resume(&saved).await?;
        }
        Commands::Render {
            data,
            transcript,
            template,
            out,
        } => render_offline(&config, data, transcript, template, out).await?,
        Commands::Stats { days, prune } => {
            let usage = UsageLogger::new(config.usage_dir.clone())?;
            if let Some(keep_days) = prune {
                let removed = usage.prune(keep_days)?;
                println!("Removed {} old log files", removed);
            }
            println!("{}", format_summary(&usage.summary(days)?));
        }
    }

    Ok(())
}

impl Commands {
    fn is_offline(&self) -> bool {
        matches!(self, Commands::Render { .. } | Commands::Stats { .. })
    }
}

fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "qrqc=debug" } else { "qrqc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_repl(config: &Config) -> Result<Repl> {
    let assets = AssetLoader::new(config.assets.clone())?
        .get()
        .await
        .context("Failed to load the prompts and report template")?;

    let gate = Arc::new(QuotaGate::new(config.quota.cooldown_minutes));
    let transport = create_transport(&config.transport)?;
    let transport = Arc::new(GatedTransport::new(transport, gate));

    let engine = ConversationEngine::new(transport, Arc::new(assets.prompts.clone()));
    let usage = UsageLogger::new(config.usage_dir.clone())?;

    Repl::new(config, engine, assets.template.clone(), usage)
}

async fn render_offline(
    config: &Config,
    data: PathBuf,
    transcript: Option<PathBuf>,
    template: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let client = reqwest::Client::new();
    let template_source = template.unwrap_or_else(|| config.assets.template_url.clone());
    let template: ReportTemplate = fetch_document(&client, &template_source).await?;

    let data_text = std::fs::read_to_string(&data)
        .with_context(|| format!("Failed to read report data: {}", data.display()))?;
    let data: serde_json::Value = serde_json::from_str(&data_text)
        .with_context(|| format!("Report data is not valid JSON: {}", data.display()))?;

    let turns = match transcript {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read discussion: {}", path.display()))?;
            parse_transcript(&text)?
        }
        None => Vec::new(),
    };

    let out_dir = out.unwrap_or_else(|| config.output.directory.clone());
    let saved = save_report(&out_dir, &template, &data, &turns, Local::now())?;

    println!("Report saved to {}", saved.path.display());
    for warning in &saved.warnings {
        println!("  note: {}", warning);
    }
    Ok(())
}
