use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use vehimatch_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "vehimatch", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/vehimatch/vehicle.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Make abbreviation table, JSON or TOML (default: built-in table)
    #[arg(long, global = true)]
    aliases: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Generate noisy query variants for the canonical corpus
    ///
    /// Pages through every (make, model, year) record in the database and
    /// corrupts each one into several distinct, human-like query strings:
    ///
    /// - typo_model / typo_make: two adjacent letters swapped
    /// - abbrev: make replaced by its abbreviation (e.g. Volkswagen -> VW)
    /// - reorder: year, make and model shuffled
    /// - drop: one of the three tokens left out
    ///
    /// Variants are stored with their ground truth in the 'noisy_variants'
    /// table, one transaction per batch. Records whose variants cannot be
    /// made distinct (e.g. very short names) are skipped and reported.
    ///
    /// Use --seed for a reproducible variant set.
    Generate {
        /// Process only the first N canonical records
        #[arg(long)]
        limit: Option<usize>,

        /// Variants per record
        #[arg(long)]
        variants: Option<usize>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Delete previously generated variants first
        #[arg(long)]
        replace: bool,
    },
    /// Evaluate a search backend against stored noisy queries
    ///
    /// Sends each stored noisy query to Elasticsearch, restricting results
    /// to the year found in the query text when there is one, and scores
    /// the query correct when any of the top-k hits is the ground-truth
    /// vehicle. Failed or timed-out queries count as misses.
    ///
    /// Ctrl-C stops scheduling new queries; results so far are reported.
    /// Every run is recorded; see 'vehimatch runs'.
    Evaluate {
        /// Number of stored queries to evaluate
        #[arg(long)]
        limit: Option<usize>,

        /// Hits requested per query
        #[arg(long)]
        top_k: Option<usize>,

        /// Backend calls in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-query timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print every missed query
        #[arg(long)]
        show_misses: bool,
    },
    /// Run one ad hoc query against the search backend
    Search {
        /// Query text
        #[arg(required = true)]
        query: Vec<String>,

        /// Hits to show
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Show corpus and variant statistics
    Status,
    /// List recent evaluation runs
    Runs {
        /// Number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one value, or the whole config file
    Get {
        /// Dotted key, e.g. elasticsearch.url
        key: Option<String>,
    },
    /// Set a value in the config file
    Set {
        /// Dotted key, e.g. evaluation.top_k
        key: String,
        value: String,
    },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file with defaults
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_with_overrides(cli.db, cli.aliases)?;

    if let Err(e) = twyg::setup(config.logging.clone()) {
        eprintln!("Failed to set up logging: {e:?}");
    }

    let command = match cli.command {
        Commands::Config { action } => return run_config(&config, action),
        command => command,
    };

    // A configured but unreadable alias table stops every command.
    let aliases = Arc::new(config.alias_table()?);

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    match command {
        Commands::Generate {
            limit,
            variants,
            seed,
            replace,
        } => {
            let mut settings = config.generation.clone();
            settings.limit = limit.or(settings.limit);
            settings.variants_per_record = variants.unwrap_or(settings.variants_per_record);
            settings.seed = seed.or(settings.seed);
            commands::run_generate(&config, aliases, settings, replace).await?;
        }
        Commands::Evaluate {
            limit,
            top_k,
            concurrency,
            timeout_ms,
            show_misses,
        } => {
            let mut settings = config.evaluation.clone();
            settings.limit = limit.unwrap_or(settings.limit);
            settings.top_k = top_k.unwrap_or(settings.top_k);
            settings.concurrency = concurrency.unwrap_or(settings.concurrency);
            settings.timeout_ms = timeout_ms.unwrap_or(settings.timeout_ms);
            commands::run_evaluate(&config, &settings, show_misses).await?;
        }
        Commands::Search { query, top_k } => {
            commands::run_search(&config, &query.join(" "), top_k).await?;
        }
        Commands::Status => {
            commands::show_status(&config)?;
        }
        Commands::Runs { limit } => {
            commands::list_runs(&config, limit)?;
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn run_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => commands::config::show_config(config),
        ConfigAction::Get { key } => commands::config::get_config(config, key),
        ConfigAction::Set { key, value } => commands::config::set_config(&key, &value),
        ConfigAction::Path => commands::config::show_path(),
        ConfigAction::Example => commands::config::show_example(),
        ConfigAction::Init => commands::config::init_config(),
    }
}
