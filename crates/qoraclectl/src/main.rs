//! qoraclectl - consult the Oracle from the terminal.
//!
//! Commands:
//!   qoraclectl consult <TEXT>...    Single reading (stdin when TEXT is omitted)
//!   qoraclectl session              Interactive readings, one per line
//!   qoraclectl history              Recent readings from the ledger
//!   qoraclectl config               Effective configuration

use clap::Parser;
use qoraclectl::cli::{Cli, Commands};
use qoraclectl::commands::{self, ConsultOptions, GlobalOptions};
use qoraclectl::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let global = GlobalOptions {
        config: cli.config,
        no_color: cli.no_color,
    };

    let outcome = match cli.command {
        Commands::Consult {
            text,
            json,
            seed,
            backend,
            no_ledger,
        } => {
            let opts = ConsultOptions {
                json,
                seed,
                backend,
                no_ledger,
            };
            commands::consult(&global, &text, &opts)
        }
        Commands::Session {
            seed,
            backend,
            no_ledger,
        } => {
            let opts = ConsultOptions {
                json: false,
                seed,
                backend,
                no_ledger,
            };
            commands::session(&global, &opts)
        }
        Commands::History { limit, json } => commands::history(&global, limit, json),
        Commands::Config { path } => commands::config(&global, path),
    };

    let code = match outcome {
        Ok(code) => code,
        Err(e) => commands::report_error(&e),
    };

    std::process::exit(code);
}
