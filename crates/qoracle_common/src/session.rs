//! Session - the caller side of a consult.
//!
//! Wires an oracle to a session history and an optional ledger sink.
//! A ledger failure is logged and otherwise ignored: the reading is already
//! in hand and the user should still see it.

use crate::error::Result;
use crate::history::{HistoryEntry, SessionHistory};
use crate::ledger::{LedgerRecord, LedgerSink};
use crate::oracle::Oracle;
use crate::resonance::ClassificationResult;
use tracing::{info, warn};

pub struct Session<O: Oracle> {
    oracle: O,
    history: SessionHistory,
    ledger: Option<Box<dyn LedgerSink>>,
    ledger_failures: usize,
}

impl<O: Oracle> Session<O> {
    pub fn new(oracle: O, history: SessionHistory) -> Self {
        Self {
            oracle,
            history,
            ledger: None,
            ledger_failures: 0,
        }
    }

    pub fn with_ledger(mut self, ledger: Box<dyn LedgerSink>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Consult the oracle, then record the reading.
    ///
    /// Nothing is recorded when the oracle fails.
    pub fn consult(&mut self, text: &str) -> Result<ClassificationResult> {
        let result = self.oracle.consult(text)?;
        let backend = self.oracle.name();

        info!(
            backend,
            category = %result.category,
            score = result.score,
            "reading"
        );

        let entry = HistoryEntry::new(text.trim(), result.clone());

        if let Some(ledger) = self.ledger.as_mut() {
            let record = LedgerRecord::from_entry(&entry, backend);
            if let Err(e) = ledger.append(&record) {
                self.ledger_failures += 1;
                warn!("ledger append failed: {}", e);
            }
        }

        self.history.push(entry);
        Ok(result)
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut SessionHistory {
        &mut self.history
    }

    pub fn oracle_name(&self) -> &'static str {
        self.oracle.name()
    }

    /// Appends that failed since the session started
    pub fn ledger_failures(&self) -> usize {
        self.ledger_failures
    }
}
