//! Qoracle Common - readings, oracles and the session plumbing around them.
//!
//! The resonance classifier is the core: a keyword table that sorts an offering
//! into one of four voices and draws a coherence score. Everything else here is
//! either an alternate oracle (LLM) or caller-side bookkeeping (history, ledger).

pub mod config;
pub mod error;
pub mod history;
pub mod ledger;
pub mod llm_client;
pub mod oracle;
pub mod reading;
pub mod resonance;
pub mod sentiment;
pub mod session;

pub use config::QoracleConfig;
pub use error::{QoracleError, Result};
pub use history::{HistoryEntry, SessionHistory};
pub use ledger::{JsonlLedger, LedgerRecord, LedgerSink};
pub use oracle::Oracle;
pub use reading::Reading;
pub use resonance::{Category, ClassificationResult, ResonanceClassifier, ScoreRange};
pub use session::Session;
