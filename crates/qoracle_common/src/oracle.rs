//! Oracles - interchangeable producers of readings.
//!
//! - RuleOracle: local resonance classifier
//! - LlmOracle: external reasoning service, same output contract
//! - FallbackOracle: primary first, secondary when the primary fails
//!
//! Every oracle enforces the minimum input length before doing anything else,
//! and `InsufficientInput` is never retried against another oracle.

use crate::config::{BackendKind, QoracleConfig};
use crate::error::{QoracleError, Result};
use crate::llm_client::{HttpLlmClient, LlmClient};
use crate::reading::{parse_reading, READING_SCHEMA};
use crate::resonance::{ClassificationResult, ResonanceClassifier};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

/// Anything that can turn an offering into a reading
pub trait Oracle {
    fn consult(&mut self, text: &str) -> Result<ClassificationResult>;

    /// Short backend name for logs and the ledger
    fn name(&self) -> &'static str;
}

impl<O: Oracle + ?Sized> Oracle for Box<O> {
    fn consult(&mut self, text: &str) -> Result<ClassificationResult> {
        (**self).consult(text)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

// ============================================================================
// Rule Oracle
// ============================================================================

/// Local classifier with an owned random source
pub struct RuleOracle<R: Rng> {
    classifier: ResonanceClassifier,
    rng: R,
}

impl<R: Rng> RuleOracle<R> {
    pub fn new(classifier: ResonanceClassifier, rng: R) -> Self {
        Self { classifier, rng }
    }

    pub fn classifier(&self) -> &ResonanceClassifier {
        &self.classifier
    }
}

impl<R: Rng> Oracle for RuleOracle<R> {
    fn consult(&mut self, text: &str) -> Result<ClassificationResult> {
        self.classifier.classify(text, &mut self.rng)
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

// ============================================================================
// LLM Oracle
// ============================================================================

/// Instructions for the external reasoning service
pub const ORACLE_SYSTEM_PROMPT: &str = "\
You are Hakeem, a calm relational guide. Read the user's offering and choose ONE voice:
- The Stabilizer: distress, anger, sadness, feeling stuck. Coherence 30-60.
- The Companion: questions, curiosity, building or learning something. Coherence 85-98.
- The Mirror: joy, gratitude, excitement. Coherence 95-100.
- The Observer: anything else. Coherence 70-85.
Reply with a diagnosis, a reframing shift and one concrete action, one sentence each.
Respond with JSON only.";

pub struct LlmOracle<C: LlmClient> {
    client: C,
    min_input_length: usize,
}

impl<C: LlmClient> LlmOracle<C> {
    pub fn new(client: C, min_input_length: usize) -> Self {
        Self {
            client,
            min_input_length,
        }
    }
}

impl<C: LlmClient> Oracle for LlmOracle<C> {
    fn consult(&mut self, text: &str) -> Result<ClassificationResult> {
        let trimmed = text.trim();
        let length = trimmed.chars().count();
        if length < self.min_input_length {
            return Err(QoracleError::InsufficientInput {
                length,
                minimum: self.min_input_length,
            });
        }

        let value = self
            .client
            .call_json(ORACLE_SYSTEM_PROMPT, trimmed, READING_SCHEMA)?;
        let result = parse_reading(&value)?;
        info!(category = %result.category, score = result.score, "llm reading");
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

// ============================================================================
// Fallback Oracle
// ============================================================================

pub struct FallbackOracle {
    primary: Box<dyn Oracle>,
    fallback: Box<dyn Oracle>,
    last_used: &'static str,
}

impl FallbackOracle {
    pub fn new(primary: Box<dyn Oracle>, fallback: Box<dyn Oracle>) -> Self {
        let last_used = primary.name();
        Self {
            primary,
            fallback,
            last_used,
        }
    }

    /// Which oracle produced the most recent reading
    pub fn last_used(&self) -> &'static str {
        self.last_used
    }
}

impl Oracle for FallbackOracle {
    fn consult(&mut self, text: &str) -> Result<ClassificationResult> {
        match self.primary.consult(text) {
            Ok(result) => {
                self.last_used = self.primary.name();
                Ok(result)
            }
            Err(e) if e.is_insufficient_input() => Err(e),
            Err(e) => {
                warn!(
                    "{} oracle failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.last_used = self.fallback.name();
                self.fallback.consult(text)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.last_used
    }
}

// ============================================================================
// Construction from config
// ============================================================================

/// Build the oracle the configuration asks for.
///
/// `seed` makes the rule-based draws reproducible; `None` seeds from entropy.
pub fn from_config(config: &QoracleConfig, seed: Option<u64>) -> Result<Box<dyn Oracle>> {
    let classifier = ResonanceClassifier::from_config(&config.classifier)?;
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let rules = RuleOracle::new(classifier, rng);

    match config.backend.kind {
        BackendKind::Rules => Ok(Box::new(rules)),
        BackendKind::Llm => {
            let client = HttpLlmClient::new(config.backend.llm.clone())?;
            let llm = LlmOracle::new(client, config.classifier.min_input_length);
            if config.backend.fallback_to_rules {
                Ok(Box::new(FallbackOracle::new(Box::new(llm), Box::new(rules))))
            } else {
                Ok(Box::new(llm))
            }
        }
    }
}
