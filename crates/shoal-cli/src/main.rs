// crates/shoal-cli/src/main.rs
//
// CLI entrypoint for Shoal, a liquid-staking accounting engine.
//
// Every invocation loads the configuration, opens the local RocksDB store,
// runs at most one protocol operation as the acting account, and commits
// the resulting state and events.

mod commands;
mod config;
mod context;
mod keys;
mod output;

use clap::{Parser, Subcommand};
use commands::events::EventsArgs;
use commands::gov::GovCmd;
use commands::slots::SlotsCmd;
use commands::submit::{BatchDepositArgs, SubmitArgs};
use commands::token::TokenCmd;
use commands::vault::VaultCmd;
use config::ShoalConfig;
use context::Session;
use output::OutputFormat;

/// Shoal CLI: submit base asset, stake receipt tokens, and govern the minter.
#[derive(Parser, Debug)]
#[command(
    name = "shoal",
    version = "0.1.0",
    about = "Shoal liquid-staking accounting engine"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "~/.shoal/config.toml")]
    config: String,

    /// Name of the account key to act as.
    #[arg(long, global = true, default_value = "default")]
    key: String,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the configuration, create the account key, and initialize state.
    Init,

    /// Generate a new account key.
    Keygen {
        /// Key name (defaults to --key).
        #[arg(long)]
        name: Option<String>,
        /// Replace an existing key with the same name.
        #[arg(long)]
        force: bool,
    },

    /// Staking slot registry: add, generate, list.
    #[command(subcommand)]
    Slots(SlotsCmd),

    /// Submit base asset and receive receipt tokens.
    Submit(SubmitArgs),

    /// Submit base asset and stake the receipt tokens in the vault.
    SubmitAndStake(SubmitArgs),

    /// Forward whole units of free balance to staking slots.
    BatchDeposit(BatchDepositArgs),

    /// Receipt token: transfer, approve, balance.
    #[command(subcommand)]
    Token(TokenCmd),

    /// Governance: ratio, reserve, pauses, recovery.
    #[command(subcommand)]
    Gov(GovCmd),

    /// Stake vault operations and views.
    #[command(subcommand)]
    Vault(VaultCmd),

    /// Display protocol totals.
    Status,

    /// Display the committed event log.
    Events(EventsArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, falling back to defaults if the file
    // is not found.
    let loaded = ShoalConfig::load(&cli.config);
    let config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => ShoalConfig::default(),
    };

    // Initialize tracing subscriber for structured logging. RUST_LOG wins
    // over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &loaded {
        Ok(_) => tracing::debug!("Loaded configuration from {}", cli.config),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            cli.config,
            e
        ),
    }

    let format = OutputFormat::from_flag(cli.json);

    let session = || Session::open(&config, &cli.key);

    match &cli.command {
        Commands::Init => commands::init::run(&cli.config, config.clone(), &cli.key, format)?,
        Commands::Keygen { name, force } => {
            let name = name.as_deref().unwrap_or(&cli.key);
            commands::keygen::run(&config, name, *force, format)?
        }
        Commands::Slots(cmd) => commands::slots::run(&session()?, cmd, format)?,
        Commands::Submit(args) => commands::submit::run_submit(&session()?, args, format)?,
        Commands::SubmitAndStake(args) => {
            commands::submit::run_submit_and_stake(&session()?, args, format)?
        }
        Commands::BatchDeposit(args) => {
            commands::submit::run_batch_deposit(&session()?, args, format)?
        }
        Commands::Token(cmd) => commands::token::run(&session()?, cmd, format)?,
        Commands::Gov(cmd) => commands::gov::run(&session()?, cmd, format)?,
        Commands::Vault(cmd) => commands::vault::run(&session()?, cmd, format)?,
        Commands::Status => commands::status::run(&session()?, format)?,
        Commands::Events(args) => commands::events::run(&session()?, args, format)?,
    }

    Ok(())
}
