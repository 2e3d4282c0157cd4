//! llm-phraser CLI entry point.
//!
//! Provides `serve`, `preview`, and `check-catalog` subcommands for running
//! the HTTP service, printing the prompt pair for one decision, or
//! validating the configured template catalog.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use llm_phraser::config::PhraserConfig;
use llm_phraser::prompt::PhraserInput;
use llm_phraser::service::{load_builder, PhraseRequest};

/// llm-phraser: phrases negotiation decisions via an LLM.
#[derive(Parser)]
#[command(name = "llm-phraser", version, about)]
struct Cli {
    /// Config file path (default: `$PHRASER_CONFIG_PATH` or `./phraser.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to bind, overriding `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the prompt pair built for one decision without calling the LLM.
    Preview {
        /// Decision key, e.g. `STANDARD_COUNTER`.
        #[arg(long)]
        key: String,
        /// Counter price.
        #[arg(long)]
        price: Option<f64>,
        /// Seed for template selection.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Load and validate the configured template catalog.
    CheckCatalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = PhraserConfig::load(cli.config).context("failed to load configuration")?;

    match cli.command {
        Command::Serve { bind } => handle_serve(config, bind).await,
        Command::Preview { key, price, seed } => handle_preview(&config, key, price, seed),
        Command::CheckCatalog => handle_check_catalog(&config),
    }
}

/// Run the HTTP service until shutdown.
async fn handle_serve(mut config: PhraserConfig, bind: Option<String>) -> anyhow::Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let _logging_guard = match &config.logging.logs_dir {
        Some(dir) => Some(llm_phraser::logging::init_production(dir, &config.logging.level)?),
        None => {
            llm_phraser::logging::init_cli(&config.logging.level)?;
            None
        }
    };

    config.validate().context("invalid configuration")?;
    info!(version = env!("CARGO_PKG_VERSION"), "llm-phraser starting");

    llm_phraser::server::run(&config).await
}

/// Print the prompt pair for one decision.
fn handle_preview(
    config: &PhraserConfig,
    key: String,
    price: Option<f64>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    llm_phraser::logging::init_cli("warn")?;

    let input: PhraserInput = PhraseRequest {
        decision_key: Some(key),
        counter_price: price,
        ..PhraseRequest::default()
    }
    .into_input()?;

    let builder = load_builder(config)?;
    let pair = match seed {
        Some(seed) => builder.build_with_rng(&input, &mut StdRng::seed_from_u64(seed)),
        None => builder.build(&input),
    };

    if !builder.catalog().contains(&input.decision_key) {
        eprintln!(
            "note: '{}' is not in the catalog, using the '{}' family",
            input.decision_key,
            builder.catalog().fallback_key()
        );
    }
    println!("{}", serde_json::to_string_pretty(&pair)?);
    Ok(())
}

/// Validate the catalog and print a summary.
fn handle_check_catalog(config: &PhraserConfig) -> anyhow::Result<()> {
    llm_phraser::logging::init_cli("warn")?;

    let builder = load_builder(config)?;
    let catalog = builder.catalog();
    catalog.validate().context("catalog failed validation")?;

    println!(
        "catalog {} ({} mode), fallback '{}'",
        catalog.version(),
        builder.mode(),
        catalog.fallback_key()
    );
    for (key, family) in catalog.families() {
        println!("  {key}: {} template(s)", family.len());
    }
    Ok(())
}
