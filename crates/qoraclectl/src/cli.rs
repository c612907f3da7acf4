//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Qoracle CLI
#[derive(Parser, Debug)]
#[command(name = "qoraclectl")]
#[command(about = "Qoracle - weigh a thought, receive a reading", long_about = None)]
#[command(version = env!("QORACLE_VERSION"))]
pub struct Cli {
    /// Config file (overrides $QORACLE_CONFIG and default locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colors regardless of config
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Offer a thought and receive a reading (reads stdin when TEXT is omitted)
    Consult {
        /// The offering
        text: Vec<String>,

        /// Print the reading as JSON
        #[arg(long)]
        json: bool,

        /// Seed the random source for reproducible readings
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured backend (rules, llm)
        #[arg(long)]
        backend: Option<String>,

        /// Do not append to the ledger
        #[arg(long)]
        no_ledger: bool,
    },

    /// Interactive session: one offering per line, `:history`, `:quit`
    Session {
        /// Seed the random source for reproducible readings
        #[arg(long)]
        seed: Option<u64>,

        /// Override the configured backend (rules, llm)
        #[arg(long)]
        backend: Option<String>,

        /// Do not append to the ledger
        #[arg(long)]
        no_ledger: bool,
    },

    /// Show recent readings from the ledger
    History {
        /// Number of readings to show
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Output JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Print only the config file path in use
        #[arg(long)]
        path: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_consult_joins_words() {
        let cli = Cli::parse_from(["qoraclectl", "consult", "--seed", "4", "I", "feel", "stuck"]);
        match cli.command {
            Commands::Consult { text, seed, json, .. } => {
                assert_eq!(text.join(" "), "I feel stuck");
                assert_eq!(seed, Some(4));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["qoraclectl", "history", "-vv", "--no-color", "--limit", "3"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::History { limit: 3, json: false }));
    }
}
