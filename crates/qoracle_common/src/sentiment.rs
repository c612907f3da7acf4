//! Bag-of-words sentiment ratio and the optional coherence nudge.
//!
//! ratio = positive / (positive + negative), 0.5 when no marker appears.
//! The nudge is cosmetic variance, not a scoring model.

use rand::Rng;
use std::collections::HashSet;

/// Largest adjustment the nudge applies in either direction
pub const NUDGE_MAX: u8 = 5;

/// Neutral ratio when no markers are present
pub const NEUTRAL_RATIO: f64 = 0.5;

/// Split lower-cased text into alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Positive and negative marker words
#[derive(Debug, Clone, Default)]
pub struct SentimentLexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl SentimentLexicon {
    /// Only alphanumeric markers are kept; punctuation can't be counted per token.
    pub fn new<P, N, S>(positive: P, negative: N) -> Self
    where
        P: IntoIterator<Item = S>,
        N: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            positive: Self::markers(positive),
            negative: Self::markers(negative),
        }
    }

    fn markers<I, S>(words: I) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty() && w.chars().all(char::is_alphanumeric))
            .collect()
    }

    /// (positive, negative) marker occurrences in the text
    pub fn counts(&self, text: &str) -> (usize, usize) {
        let lowered = text.to_lowercase();
        tokenize(&lowered).iter().fold((0, 0), |(pos, neg), token| {
            (
                pos + usize::from(self.positive.contains(*token)),
                neg + usize::from(self.negative.contains(*token)),
            )
        })
    }

    pub fn ratio(&self, text: &str) -> f64 {
        match self.counts(text) {
            (0, 0) => NEUTRAL_RATIO,
            (pos, neg) => pos as f64 / (pos + neg) as f64,
        }
    }
}

/// Push the score up (ratio > 0.5) or down (ratio < 0.5) by a random
/// amount in 0..=NUDGE_MAX, clamped to [0, 100].
pub fn nudge<R: Rng + ?Sized>(score: u8, ratio: f64, rng: &mut R) -> u8 {
    let delta = i16::from(rng.gen_range(0..=NUDGE_MAX));
    let adjusted = if ratio > NEUTRAL_RATIO {
        i16::from(score) + delta
    } else if ratio < NEUTRAL_RATIO {
        i16::from(score) - delta
    } else {
        i16::from(score)
    };
    adjusted.clamp(0, 100) as u8
}
