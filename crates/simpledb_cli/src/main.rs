//! SimpleDB CLI
//!
//! Command-line tools for SimpleDB store maintenance.
//!
//! # Commands
//!
//! - `collections` - List registered collections
//! - `add-collection` - Register a collection
//! - `check` - Report inconsistencies
//! - `fix` - Repair inconsistencies

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use simpledb_core::IdAlgorithm;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SimpleDB command-line store tools.
#[derive(Parser)]
#[command(name = "simpledb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// JSON on stdout
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered collections
    Collections {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Register a collection (creates the store if needed)
    AddCollection {
        /// Collection name (ASCII letters and digits)
        name: String,

        /// Id algorithm: cuid2, tid62, seq10, seq36 or custom
        #[arg(short, long, default_value = "tid62")]
        algorithm: IdAlgorithm,
    },

    /// Report inconsistencies without changing anything
    Check {
        /// Also read every record and compare counters with ids
        #[arg(short, long)]
        deep: bool,

        /// Only check this collection
        #[arg(short, long)]
        collection: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Repair inconsistencies
    Fix {
        /// Also read every record and compare counters with ids
        #[arg(short, long)]
        deep: bool,

        /// Only repair this collection
        #[arg(short, long)]
        collection: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins unless --verbose is given
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let path = cli.path.ok_or("Store path required (--path)")?;

    match cli.command {
        Commands::Collections { format } => {
            commands::collections::list(&path, format)?;
        }
        Commands::AddCollection { name, algorithm } => {
            commands::collections::add(&path, &name, algorithm)?;
        }
        Commands::Check {
            deep,
            collection,
            format,
        } => {
            commands::check::run(&path, deep, collection, false, format)?;
        }
        Commands::Fix {
            deep,
            collection,
            format,
        } => {
            commands::check::run(&path, deep, collection, true, format)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_flags() {
        let cli = Cli::parse_from([
            "simpledb", "--path", "/tmp/s", "check", "--deep", "-c", "users", "-f", "json",
        ]);
        match cli.command {
            Commands::Check {
                deep,
                collection,
                format,
            } => {
                assert!(deep);
                assert_eq!(collection.as_deref(), Some("users"));
                assert_eq!(format, Format::Json);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn parses_algorithm_names() {
        let cli = Cli::parse_from(["simpledb", "-p", "s", "add-collection", "inv", "-a", "seq36"]);
        match cli.command {
            Commands::AddCollection { name, algorithm } => {
                assert_eq!(name, "inv");
                assert_eq!(algorithm, IdAlgorithm::Seq36);
            }
            _ => panic!("expected add-collection"),
        }

        assert!(Cli::try_parse_from(["simpledb", "add-collection", "inv", "-a", "uuid"]).is_err());
    }
}
