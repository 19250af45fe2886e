//! simbook CLI - Command-line interface for the SIM phonebook layer.
//!
//! Drives the phonebook manager against a simulated card: list, add,
//! delete, and update records, query file capacity and slot counts.
//! Useful for exploring the layer's behavior (EF translation, fixed-dialing
//! auth codes, count bookkeeping) without radio hardware.

mod commands;

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::debug;

use sb_core::config::AppConfig;
use sb_core::error::SbResult;
use sb_core::logging;

/// simbook - SIM/UICC phonebook access layer.
#[derive(Parser)]
#[command(
    name = "simbook",
    version,
    about = "SIM phonebook CLI",
    long_about = "A command-line interface for the simbook phonebook layer.\n\
                  Operates on a simulated card seeded with demo entries; the card\n\
                  shape (slots, PIN2, latency) comes from the configuration file."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List phonebook records.
    Records {
        /// Record file to read.
        #[arg(long, value_enum, default_value = "adn")]
        file: commands::FileArg,
        /// Include free slots in the listing.
        #[arg(long)]
        all: bool,
    },
    /// Insert a record into the first free slot.
    Add {
        /// Display name.
        #[arg(long)]
        tag: String,
        /// Phone number.
        #[arg(long)]
        number: String,
        /// Secondary phone numbers.
        #[arg(long = "anr")]
        anrs: Vec<String>,
        /// Email addresses.
        #[arg(long = "email")]
        emails: Vec<String>,
        /// Record file to write.
        #[arg(long, value_enum, default_value = "adn")]
        file: commands::FileArg,
        /// PIN2, required for the fixed-dialing file.
        #[arg(long)]
        pin2: Option<String>,
    },
    /// Delete a record, by slot index or by content match.
    Delete {
        /// 1-based slot index to clear.
        #[arg(long, conflicts_with_all = ["tag", "number"])]
        index: Option<usize>,
        /// Display name of the record to delete.
        #[arg(long, requires = "number")]
        tag: Option<String>,
        /// Phone number of the record to delete.
        #[arg(long, requires = "tag")]
        number: Option<String>,
        /// Record file to write.
        #[arg(long, value_enum, default_value = "adn")]
        file: commands::FileArg,
        /// PIN2, required for the fixed-dialing file.
        #[arg(long)]
        pin2: Option<String>,
    },
    /// Replace the record at a slot index.
    Update {
        /// 1-based slot index to replace.
        #[arg(long)]
        index: usize,
        /// Display name.
        #[arg(long)]
        tag: String,
        /// Phone number.
        #[arg(long)]
        number: String,
        /// Secondary phone numbers.
        #[arg(long = "anr")]
        anrs: Vec<String>,
        /// Email addresses.
        #[arg(long = "email")]
        emails: Vec<String>,
        /// Record file to write.
        #[arg(long, value_enum, default_value = "adn")]
        file: commands::FileArg,
        /// PIN2, required for the fixed-dialing file.
        #[arg(long)]
        pin2: Option<String>,
    },
    /// Show the capacity of a record file.
    Capacity {
        /// Record file to query.
        #[arg(long, value_enum, default_value = "adn")]
        file: commands::FileArg,
    },
    /// Show phonebook slot counts.
    Counts,
    /// Show the simulated card's applications and generation.
    Card,
}

fn main() -> SbResult<()> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_file(Path::new(path))?,
        None => AppConfig::load_default()?,
    };

    let log_level = if cli.verbose { "debug".to_string() } else { config.logging.level.clone() };
    let _guard = logging::init_logging(
        &log_level,
        config.effective_log_dir().as_deref(),
        config.logging.json_output,
    )?;
    debug!("simbook CLI v{}", sb_core::constants::APP_VERSION);

    match cli.command {
        Commands::Records { file, all } => commands::records(&config, file, all, cli.format),
        Commands::Add { tag, number, anrs, emails, file, pin2 } => {
            commands::add(&config, file, tag, number, anrs, emails, pin2, cli.format)
        }
        Commands::Delete { index, tag, number, file, pin2 } => {
            commands::delete(&config, file, index, tag, number, pin2, cli.format)
        }
        Commands::Update { index, tag, number, anrs, emails, file, pin2 } => {
            commands::update(&config, file, index, tag, number, anrs, emails, pin2, cli.format)
        }
        Commands::Capacity { file } => commands::capacity(&config, file, cli.format),
        Commands::Counts => commands::counts(&config, cli.format),
        Commands::Card => commands::card(&config, cli.format),
    }
}
