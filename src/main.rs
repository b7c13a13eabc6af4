//! # Prism CLI (`prism`)
//!
//! The `prism` binary is the primary interface for the context selection
//! engine. It provides commands for usage-database initialization, packing,
//! profile inspection, usage history, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! prism --config ./config/prism.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `prism init` | Create the usage database and schema |
//! | `prism pack "<task>"` | Route, score, pack, and record a selection |
//! | `prism profiles` | List registered profiles and router rules |
//! | `prism history` | Print recent usage records |
//! | `prism serve` | Start the JSON HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the usage database
//! prism init --config ./config/prism.toml
//!
//! # Pack with routed profile selection
//! prism pack "refactor the css grid layout"
//!
//! # Pack with an explicit profile, machine-readable output
//! prism pack "build api endpoint" --profile backend --json
//!
//! # Inspect recent packing decisions
//! prism history --limit 20
//! ```
//!
//! Exit code is 0 on success and non-zero when the manifest store is
//! unavailable or configuration is invalid; callers treat a non-zero exit
//! as "fall back to full context".

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use prism::config;
use prism::engine::Engine;
use prism::server;

/// Prism — a profile-aware context selection engine for AI coding agents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/prism.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "prism",
    about = "Prism — a profile-aware context selection engine for AI coding agents",
    version,
    long_about = "Prism scores cached manifest documents against a task description and packs \
    a subset under an agent profile's byte budget, in tier priority order. Packing decisions \
    are appended to a SQLite usage log for offline analysis."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/prism.toml`. Store, registry, usage-log, and
    /// server settings are read from this file; `PRISM_STORE_ROOT`,
    /// `PRISM_REGISTRY_PATH`, and `PRISM_USAGE_DB` override the paths.
    #[arg(long, global = true, default_value = "./config/prism.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the usage database schema.
    ///
    /// Creates the SQLite database file and the usage_log table. This
    /// command is idempotent — running it multiple times is safe.
    Init,

    /// Route, score, pack, and record a selection for a task.
    ///
    /// Without `--profile`, the task text is classified against the
    /// registry's router rules (first match wins) and falls back to the
    /// default profile. The selection is printed and appended to the
    /// usage log.
    Pack {
        /// Free-text task description.
        task: String,

        /// Pack for this profile instead of routing by task text.
        #[arg(long)]
        profile: Option<String>,

        /// Emit the selection as JSON instead of the table view.
        #[arg(long)]
        json: bool,
    },

    /// List registered profiles, budgets, tiers, and router rules.
    Profiles,

    /// Print recent usage records, most recent first.
    History {
        /// Maximum number of records to print.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and exposes
    /// `/pack`, `/profiles`, `/usage/recent`, and `/health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prism=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let engine = Engine::from_config(&cfg).await?;
            engine.close().await;
            println!("Usage database initialized successfully.");
        }
        Commands::Pack {
            task,
            profile,
            json,
        } => {
            let engine = Engine::from_config(&cfg).await?;
            let result = engine.select(&task, profile.as_deref()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.report())?);
            } else {
                println!("pack {}", result.profile_name);
                println!("  task: \"{}\"", task);
                println!("  budget: {} bytes", result.budget_bytes);
                println!(
                    "  selected: {} documents, {} bytes ({:.1}% reduction)",
                    result.documents_selected.len(),
                    result.total_bytes,
                    result.reduction_ratio * 100.0
                );
                for (i, doc) in result.documents_selected.iter().enumerate() {
                    println!(
                        "  {}. [{:.2}] {} / {} ({} bytes)",
                        i + 1,
                        doc.score,
                        doc.tier,
                        doc.name,
                        doc.size_bytes
                    );
                }
                println!("ok");
            }
            engine.close().await;
        }
        Commands::Profiles => {
            let engine = Engine::from_config(&cfg).await?;
            let registry = engine.registry();

            println!("{:<16} {:>12} TIERS", "PROFILE", "BUDGET");
            for profile in registry.profiles() {
                let tiers: Vec<&str> = profile.tiers.iter().map(|t| t.name.as_str()).collect();
                let default_marker = if profile.name == registry.default_profile().name {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "{:<16} {:>12} {}{}",
                    profile.name,
                    profile.max_bytes,
                    tiers.join(", "),
                    default_marker
                );
            }

            if !registry.rules().is_empty() {
                println!();
                println!("Router rules (first match wins):");
                for (i, rule) in registry.rules().iter().enumerate() {
                    println!("  {}. {} -> {}", i + 1, rule.keywords.join(", "), rule.profile);
                }
            }
            engine.close().await;
        }
        Commands::History { limit } => {
            let engine = Engine::from_config(&cfg).await?;
            let records = engine.recent_usage(limit).await;

            if records.is_empty() {
                println!("No usage records.");
            } else {
                for record in &records {
                    let when = chrono::DateTime::from_timestamp(record.recorded_at, 0)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                        .unwrap_or_else(|| record.recorded_at.to_string());
                    println!(
                        "{}  {:<14} {:>8} / {:>8} bytes  [{}]",
                        when,
                        record.profile_name,
                        record.total_bytes,
                        record.budget_bytes,
                        record.documents_selected.join(", ")
                    );
                    println!("    task: \"{}\"", record.task_excerpt);
                }
            }
            engine.close().await;
        }
        Commands::Serve => {
            let engine = Engine::from_config(&cfg).await?;
            server::run_server(&cfg, engine).await?;
        }
    }

    Ok(())
}
