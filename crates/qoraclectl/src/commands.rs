//! Command handlers for qoraclectl
//!
//! Each handler returns the process exit code. Errors that are not the
//! user's fault bubble up as anyhow errors and exit with EXIT_GENERAL_ERROR.

use crate::card::{render_card, render_ledger_line, render_session_history, CardStyle};
use crate::errors::{EXIT_INSUFFICIENT_INPUT, EXIT_SUCCESS, INSUFFICIENT_INPUT_PROMPT};
use crate::pause;
use anyhow::{Context, Result};
use qoracle_common::config::BackendKind;
use qoracle_common::{
    oracle, ClassificationResult, JsonlLedger, Oracle, QoracleConfig, QoracleError, Reading,
    Session, SessionHistory,
};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub no_color: bool,
}

/// Options for `consult` and `session`
#[derive(Debug, Clone, Default)]
pub struct ConsultOptions {
    pub json: bool,
    pub seed: Option<u64>,
    pub backend: Option<String>,
    pub no_ledger: bool,
}

// ============================================================================
// Shared setup
// ============================================================================

/// Explicit --config wins; otherwise $QORACLE_CONFIG, user, system, defaults
pub fn load_config(path: Option<&Path>) -> Result<QoracleConfig> {
    match path {
        Some(path) => QoracleConfig::load_from(path),
        None => QoracleConfig::load(),
    }
}

fn build_session(config: &mut QoracleConfig, opts: &ConsultOptions) -> Result<Session<Box<dyn Oracle>>> {
    if let Some(backend) = opts.backend.as_deref() {
        config.backend.kind = backend.parse::<BackendKind>()?;
    }

    let oracle = oracle::from_config(config, opts.seed).context("Failed to set up the oracle")?;
    let mut session = Session::new(oracle, SessionHistory::new(config.history.capacity));

    if config.ledger.enabled && !opts.no_ledger {
        match config.ledger.resolved_path() {
            Some(path) => {
                debug!(path = %path.display(), "ledger enabled");
                session = session.with_ledger(Box::new(JsonlLedger::new(path)));
            }
            None => debug!("no data directory, ledger disabled"),
        }
    }

    Ok(session)
}

enum Outcome {
    Reading(ClassificationResult),
    NeedsMore,
}

fn consult_once(session: &mut Session<Box<dyn Oracle>>, text: &str) -> Result<Outcome> {
    match session.consult(text) {
        Ok(result) => Ok(Outcome::Reading(result)),
        Err(e) if e.is_insufficient_input() => {
            info!("{}", e);
            Ok(Outcome::NeedsMore)
        }
        Err(e) => Err(anyhow::Error::new(e)),
    }
}

fn print_reading(result: &ClassificationResult, json: bool, style: &CardStyle) -> Result<()> {
    if json {
        let reading = Reading::from(result);
        println!("{}", serde_json::to_string_pretty(&reading)?);
    } else {
        print!("{}", render_card(result, style));
    }
    Ok(())
}

// ============================================================================
// consult
// ============================================================================

pub fn consult(global: &GlobalOptions, words: &[String], opts: &ConsultOptions) -> Result<i32> {
    let mut config = load_config(global.config.as_deref())?;
    let style = CardStyle::resolve(config.output.color, global.no_color);

    let text = if words.is_empty() {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read offering from stdin")?;
        buf
    } else {
        words.join(" ")
    };

    let mut session = build_session(&mut config, opts)?;

    if pause::should_pause(config.output.pause_ms, opts.json) {
        pause::breathe(config.output.pause_ms);
    }

    match consult_once(&mut session, &text)? {
        Outcome::Reading(result) => {
            print_reading(&result, opts.json, &style)?;
            Ok(EXIT_SUCCESS)
        }
        Outcome::NeedsMore => {
            eprintln!("{}", INSUFFICIENT_INPUT_PROMPT);
            Ok(EXIT_INSUFFICIENT_INPUT)
        }
    }
}

// ============================================================================
// session
// ============================================================================

pub fn session(global: &GlobalOptions, opts: &ConsultOptions) -> Result<i32> {
    let mut config = load_config(global.config.as_deref())?;
    let style = CardStyle::resolve(config.output.color, global.no_color);
    let mut session = build_session(&mut config, opts)?;

    let interactive = console::Term::stdout().is_term();
    if interactive {
        println!("The Oracle is listening. `:history` to look back, `:quit` to leave.");
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("› ");
            io::stdout().flush()?;
        }

        let line = match lines.next() {
            Some(line) => line.context("Failed to read from stdin")?,
            None => break,
        };

        match line.trim() {
            "" => continue,
            ":quit" | ":q" | ":exit" => break,
            ":history" => {
                print!("{}", render_session_history(session.history(), &style));
                continue;
            }
            _ => {}
        }

        if pause::should_pause(config.output.pause_ms, opts.json) {
            pause::breathe(config.output.pause_ms);
        }

        match consult_once(&mut session, &line)? {
            Outcome::Reading(result) => print_reading(&result, opts.json, &style)?,
            Outcome::NeedsMore => println!("{}", INSUFFICIENT_INPUT_PROMPT),
        }
    }

    if session.ledger_failures() > 0 {
        eprintln!(
            "warning: {} reading(s) could not be written to the ledger",
            session.ledger_failures()
        );
    }

    Ok(EXIT_SUCCESS)
}

// ============================================================================
// history
// ============================================================================

pub fn history(global: &GlobalOptions, limit: usize, json: bool) -> Result<i32> {
    let config = load_config(global.config.as_deref())?;
    let style = CardStyle::resolve(config.output.color, global.no_color);

    let Some(path) = config.ledger.resolved_path() else {
        anyhow::bail!("No ledger path configured and no data directory available");
    };

    let ledger = JsonlLedger::new(path);
    let records = ledger.read_recent(limit)?;

    if records.is_empty() {
        if !json {
            println!("No readings recorded yet ({}).", ledger.path().display());
        }
        return Ok(EXIT_SUCCESS);
    }

    for record in &records {
        if json {
            println!("{}", record.to_log_line()?);
        } else {
            println!("{}", render_ledger_line(record, &style));
        }
    }

    Ok(EXIT_SUCCESS)
}

// ============================================================================
// config
// ============================================================================

pub fn config(global: &GlobalOptions, path_only: bool) -> Result<i32> {
    let source = global.config.clone().or_else(QoracleConfig::discover_path);

    if path_only {
        match &source {
            Some(path) => println!("{}", path.display()),
            None => println!("(built-in defaults, no config file found)"),
        }
        return Ok(EXIT_SUCCESS);
    }

    let config = match &source {
        Some(path) => QoracleConfig::load_from(path)?,
        None => QoracleConfig::default(),
    };

    match &source {
        Some(path) => println!("# {}", path.display()),
        None => println!("# built-in defaults"),
    }
    print!("{}", config.to_toml()?);

    Ok(EXIT_SUCCESS)
}

/// Map a top-level error to an exit code, printing it the way the CLI does.
pub fn report_error(err: &anyhow::Error) -> i32 {
    if let Some(qe) = err.downcast_ref::<QoracleError>() {
        if qe.is_insufficient_input() {
            eprintln!("{}", INSUFFICIENT_INPUT_PROMPT);
            return EXIT_INSUFFICIENT_INPUT;
        }
    }
    eprintln!("Error: {:#}", err);
    crate::errors::EXIT_GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
        let ledger = dir.path().join("ledger.jsonl");
        let path = dir.path().join("config.toml");
        let body = format!(
            "[ledger]\npath = \"{}\"\n\n[output]\ncolor = \"none\"\npause_ms = 0\n{}",
            ledger.display(),
            extra
        );
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "\n[history]\ncapacity = 7\n");
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.history.capacity, 7);
        assert_eq!(config.output.pause_ms, 0);
    }

    #[test]
    fn test_build_session_backend_override() {
        let mut config = QoracleConfig::default();
        config.backend.llm.enabled = false;
        config.ledger.enabled = false;
        let opts = ConsultOptions {
            backend: Some("llm".to_string()),
            seed: Some(3),
            ..Default::default()
        };
        let mut session = build_session(&mut config, &opts).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Llm);

        // LLM disabled, fallback answers
        let result = session.consult("I feel stuck").unwrap();
        assert_eq!(result.mode_label(), "The Stabilizer");
        assert_eq!(session.oracle_name(), "rules");
    }

    #[test]
    fn test_build_session_rejects_unknown_backend() {
        let mut config = QoracleConfig::default();
        let opts = ConsultOptions {
            backend: Some("tarot".to_string()),
            ..Default::default()
        };
        assert!(build_session(&mut config, &opts).is_err());
    }

    #[test]
    fn test_session_writes_ledger_when_enabled() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let mut config = load_config(Some(&path)).unwrap();
        let opts = ConsultOptions {
            seed: Some(9),
            ..Default::default()
        };

        let mut session = build_session(&mut config, &opts).unwrap();
        assert!(matches!(consult_once(&mut session, "Why is the sky blue?").unwrap(), Outcome::Reading(_)));
        assert!(matches!(consult_once(&mut session, "hi").unwrap(), Outcome::NeedsMore));

        let records = JsonlLedger::new(dir.path().join("ledger.jsonl")).read_recent(10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reading.mode, "The Companion");
    }

    #[test]
    fn test_no_ledger_flag() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        let mut config = load_config(Some(&path)).unwrap();
        let opts = ConsultOptions {
            no_ledger: true,
            ..Default::default()
        };

        let mut session = build_session(&mut config, &opts).unwrap();
        consult_once(&mut session, "I feel stuck").unwrap();
        assert!(!dir.path().join("ledger.jsonl").exists());
    }

    #[test]
    fn test_report_error_codes() {
        let short = anyhow::Error::new(QoracleError::InsufficientInput { length: 1, minimum: 3 });
        assert_eq!(report_error(&short), EXIT_INSUFFICIENT_INPUT);

        let other = anyhow::anyhow!("boom");
        assert_eq!(report_error(&other), crate::errors::EXIT_GENERAL_ERROR);
    }
}
