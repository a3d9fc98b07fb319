//! Satchel CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! satchel-cli migrate
//!
//! # Load a YAML roster into PostgreSQL
//! satchel-cli seed --file crates/server/seed/employees.yaml
//!
//! # Replace existing records with the seed's version
//! satchel-cli seed --file roster.yaml --replace
//!
//! # Inspect or remove employees
//! satchel-cli employee list
//! satchel-cli employee delete --email someone@objectcomputing.com
//! ```
//!
//! Connection settings come from the `SATCHEL_DB_*` variables (or files in
//! `SATCHEL_SECRETS_DIR`), the same as the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "satchel-cli")]
#[command(author, version, about = "Satchel CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load employees from a YAML seed document
    Seed {
        /// Seed document path
        #[arg(short, long)]
        file: PathBuf,

        /// Delete employees with the same email before saving
        #[arg(long)]
        replace: bool,
    },
    /// Inspect and remove employees
    Employee {
        #[command(subcommand)]
        action: EmployeeAction,
    },
}

#[derive(Subcommand)]
enum EmployeeAction {
    /// List the roster
    List,
    /// Delete an employee and their reflections
    Delete {
        /// Employee email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Seed { file, replace } => commands::seed::run(&file, replace).await,
        Commands::Employee { action } => match action {
            EmployeeAction::List => commands::employee::list().await,
            EmployeeAction::Delete { email } => commands::employee::delete(&email).await,
        },
    }
}
