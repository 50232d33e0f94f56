//! TeleDB Command-Line Interface
//!
//! Runs the lookup bot against a console chat adapter, and offers
//! direct database maintenance subcommands for operators.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// TeleDB - phone record lookup bot
#[derive(Parser)]
#[command(name = "teledb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Database file path (overrides DATABASE_PATH)
    #[arg(short, long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot against the console (configuration from environment)
    Run,

    /// Add a record directly to the database
    Add {
        /// Phone number
        phone: String,

        /// Record text
        content: String,
    },

    /// Look up records for a number
    Search {
        /// Phone number
        phone: String,
    },

    /// Replace record text for a number (every exact match is updated)
    Replace {
        /// Phone number
        phone: String,

        /// Current record text
        old: String,

        /// Replacement text
        new: String,
    },

    /// Delete records for a number
    Delete {
        /// Phone number
        phone: String,

        /// Only delete records with this exact text
        #[arg(short, long)]
        content: Option<String>,
    },

    /// List the most-recorded numbers
    List,

    /// Show database statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let command = cli.command.unwrap_or(Commands::Run);

    match command {
        Commands::Run => {
            commands::run(cli.database).await?;
        }
        Commands::Add { phone, content } => {
            commands::add(cli.database, &phone, &content)?;
        }
        Commands::Search { phone } => {
            commands::search(cli.database, &phone)?;
        }
        Commands::Replace { phone, old, new } => {
            commands::replace(cli.database, &phone, &old, &new)?;
        }
        Commands::Delete { phone, content } => {
            commands::delete(cli.database, &phone, content.as_deref())?;
        }
        Commands::List => {
            commands::list(cli.database)?;
        }
        Commands::Stats => {
            commands::stats(cli.database)?;
        }
    }

    Ok(())
}
