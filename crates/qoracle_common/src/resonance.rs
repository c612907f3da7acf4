//! Resonance Classifier v1.1
//!
//! Rule-based tone classification. Maps free text to one of four voices:
//! - Distress  -> The Stabilizer (anchor)
//! - Curiosity -> The Companion  (co-pilot)
//! - Positive  -> The Mirror     (reflector)
//! - Neutral   -> The Observer   (fallback)
//!
//! Categories are checked in priority order and the FIRST whose keyword set
//! matches wins, even when later categories would also match. Neutral is never
//! in the priority list; it is what you get when nothing else matched.
//!
//! The classifier is immutable after construction. All randomness (score draw,
//! phrase choice) comes from the caller's `Rng`.

use crate::config::ClassifierConfig;
use crate::error::{QoracleError, Result};
use crate::sentiment::{self, SentimentLexicon};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Category
// ============================================================================

/// The four tone buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Negative affect: anger, sadness, feeling stuck
    Distress,
    /// Questions and task-oriented requests
    Curiosity,
    /// Joy, gratitude, excitement
    Positive,
    /// Nothing else matched
    Neutral,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Distress,
        Category::Curiosity,
        Category::Positive,
        Category::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Distress => "distress",
            Self::Curiosity => "curiosity",
            Self::Positive => "positive",
            Self::Neutral => "neutral",
        }
    }

    /// Display label used on the card and in the wire `mode` field
    pub fn mode_label(&self) -> &'static str {
        match self {
            Self::Distress => "The Stabilizer",
            Self::Curiosity => "The Companion",
            Self::Positive => "The Mirror",
            Self::Neutral => "The Observer",
        }
    }

    /// Parse a mode label or semantic name.
    ///
    /// Accepts "The Stabilizer", "stabilizer", "STABILIZER" and "distress" alike.
    pub fn from_label(label: &str) -> Option<Self> {
        let lowered = label.trim().to_lowercase();
        let name = lowered.strip_prefix("the ").unwrap_or(&lowered).trim();
        match name {
            "stabilizer" | "distress" => Some(Self::Distress),
            "companion" | "curiosity" => Some(Self::Curiosity),
            "mirror" | "positive" => Some(Self::Positive),
            "observer" | "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Distress => 0,
            Self::Curiosity => 1,
            Self::Positive => 2,
            Self::Neutral => 3,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Score Range
// ============================================================================

/// Inclusive coherence range for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: u8,
    pub max: u8,
}

impl ScoreRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// A constant score, e.g. `ScoreRange::fixed(100)`
    pub const fn fixed(score: u8) -> Self {
        Self { min: score, max: score }
    }

    pub fn contains(&self, score: u8) -> bool {
        score >= self.min && score <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max && self.max <= 100
    }

    /// Uniform draw within the range
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        rng.gen_range(self.min..=self.max)
    }
}

impl std::fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

// ============================================================================
// Built-in Tables
// ============================================================================

/// Canned phrasings for one category
#[derive(Debug)]
pub struct PhraseSet {
    pub diagnosis: &'static [&'static str],
    pub shift: &'static [&'static str],
    pub action: &'static [&'static str],
}

const DISTRESS_PHRASES: PhraseSet = PhraseSet {
    diagnosis: &[
        "High internal friction detected. The logic is clouded by emotion.",
        "The signal is heavy with tension. Reaction is outpacing reflection.",
        "Emotional static is drowning out the underlying thought.",
    ],
    shift: &[
        "Unkindness is the sin. Move from reaction to observation.",
        "The feeling is real, but it is not the whole picture.",
        "Name the weight before trying to lift it.",
    ],
    action: &[
        "Let us slow down. I am holding the space while you recalibrate.",
        "Take three slow breaths before the next step.",
        "Write down the one thing that hurts most, then set it aside for a moment.",
    ],
};

const CURIOSITY_PHRASES: PhraseSet = PhraseSet {
    diagnosis: &[
        "Curiosity blocked by uncertainty (The Void).",
        "A question is forming but the path is not yet visible.",
        "The intent is clear; the first step is not.",
    ],
    shift: &[
        "Embrace the wonder of creation. The unknown is just data waiting for light.",
        "Every answer starts as a well-shaped question.",
        "Treat the gap as a map, not a wall.",
    ],
    action: &[
        "We will build this together. Step one is simply to begin.",
        "Break the question into its smallest useful piece and start there.",
        "Sketch the first draft now; refine it once it exists.",
    ],
};

const POSITIVE_PHRASES: PhraseSet = PhraseSet {
    diagnosis: &[
        "Resonance is peaking. You are touching the Quniverse.",
        "The signal is bright and coherent.",
        "Joy is running through the whole message.",
    ],
    shift: &[
        "Do not analyze the joy; embody it.",
        "Let the feeling lead instead of the commentary.",
        "Gratitude multiplies when it is noticed.",
    ],
    action: &[
        "Ride this wave. Capture this feeling as a reference point for later.",
        "Share this with someone who would enjoy it.",
        "Note what brought you here so you can find the way back.",
    ],
};

const NEUTRAL_PHRASES: PhraseSet = PhraseSet {
    diagnosis: &[
        "The input is stable but lacks directional intent.",
        "The signal is calm but unfocused.",
        "A clear surface with no current underneath yet.",
    ],
    shift: &[
        "Add specific intent to the raw capability.",
        "Stillness is a starting point, not a destination.",
        "Decide what you want this thought to do.",
    ],
    action: &[
        "Clarify the request to sharpen the result.",
        "Add one sentence about what you hope will change.",
        "Ask the question behind the statement.",
    ],
};

/// Fixed phrase table for a category
pub fn phrases(category: Category) -> &'static PhraseSet {
    match category {
        Category::Distress => &DISTRESS_PHRASES,
        Category::Curiosity => &CURIOSITY_PHRASES,
        Category::Positive => &POSITIVE_PHRASES,
        Category::Neutral => &NEUTRAL_PHRASES,
    }
}

/// Built-in keyword set for a category
pub fn default_keywords(category: Category) -> Vec<String> {
    let words: &[&str] = match category {
        Category::Distress => &[
            "sad", "angry", "hate", "useless", "stupid", "fail", "bad",
            "anxious", "depressed", "overwhelmed", "stuck",
        ],
        Category::Curiosity => &[
            "?", "what", "how", "why", "code", "help", "build", "create", "learn",
        ],
        Category::Positive => &[
            "happy", "love", "great", "wow", "sublime", "yoga", "beautiful",
            "grateful", "excited",
        ],
        // Reported only; Neutral is the fallback either way
        Category::Neutral => &["think", "feel", "observe", "wonder", "notice"],
    };
    words.iter().map(|w| w.to_string()).collect()
}

/// Built-in coherence range for a category
pub fn default_range(category: Category) -> ScoreRange {
    match category {
        Category::Distress => ScoreRange::new(30, 60),
        Category::Curiosity => ScoreRange::new(85, 98),
        Category::Positive => ScoreRange::new(95, 100),
        Category::Neutral => ScoreRange::new(70, 85),
    }
}

/// Default evaluation order
pub const DEFAULT_PRIORITY: [Category; 3] =
    [Category::Distress, Category::Curiosity, Category::Positive];

/// Default minimum trimmed input length (characters)
pub const DEFAULT_MIN_INPUT_LENGTH: usize = 3;

// ============================================================================
// Matching
// ============================================================================

/// How keywords are compared against the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keyword appears anywhere in the lower-cased text ("bad" matches "badge")
    #[default]
    Substring,
    /// Alphanumeric keywords must equal a whole token.
    /// Keywords with punctuation ("?") still match as substrings.
    WholeWord,
}

/// Per-category bundle: keywords, score range and phrases
#[derive(Debug, Clone)]
pub struct CategoryProfile {
    pub category: Category,
    pub keywords: Vec<String>,
    pub range: ScoreRange,
    pub phrases: &'static PhraseSet,
}

impl CategoryProfile {
    fn builtin(category: Category) -> Self {
        Self {
            category,
            keywords: default_keywords(category),
            range: default_range(category),
            phrases: phrases(category),
        }
    }

    /// Keywords present in the text, in table order
    fn matches(&self, lowered: &str, tokens: &[&str], mode: MatchMode) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|kw| match mode {
                MatchMode::Substring => lowered.contains(kw.as_str()),
                MatchMode::WholeWord => {
                    if kw.chars().all(char::is_alphanumeric) {
                        tokens.contains(&kw.as_str())
                    } else {
                        lowered.contains(kw.as_str())
                    }
                }
            })
            .cloned()
            .collect()
    }
}

// ============================================================================
// Classification Result
// ============================================================================

/// One reading. Built fresh per input, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    /// Coherence, always within [0, 100]
    pub score: u8,
    pub diagnosis: String,
    pub shift: String,
    pub action: String,
    /// Keywords that selected the category (display/debug only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
}

impl ClassificationResult {
    pub fn mode_label(&self) -> &'static str {
        self.category.mode_label()
    }
}

// ============================================================================
// Resonance Classifier
// ============================================================================

/// Keyword-table tone classifier
#[derive(Debug, Clone)]
pub struct ResonanceClassifier {
    min_input_length: usize,
    match_mode: MatchMode,
    priority: Vec<Category>,
    sentiment_nudge: bool,
    /// Indexed by `Category::index()`
    profiles: Vec<CategoryProfile>,
    lexicon: SentimentLexicon,
}

impl ResonanceClassifier {
    /// Classifier with the built-in tables
    pub fn new() -> Self {
        let profiles: Vec<CategoryProfile> =
            Category::ALL.iter().map(|c| CategoryProfile::builtin(*c)).collect();
        let lexicon = Self::lexicon_for(&profiles);
        Self {
            min_input_length: DEFAULT_MIN_INPUT_LENGTH,
            match_mode: MatchMode::default(),
            priority: DEFAULT_PRIORITY.to_vec(),
            sentiment_nudge: false,
            profiles,
            lexicon,
        }
    }

    /// Build from configuration. Invalid settings are rejected here so that
    /// `classify` can only ever fail on input length.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        config.validate().map_err(QoracleError::Config)?;

        let profiles: Vec<CategoryProfile> = Category::ALL
            .iter()
            .map(|c| CategoryProfile {
                category: *c,
                keywords: normalize_keywords(config.keywords.get(*c)),
                range: *config.ranges.get(*c),
                phrases: phrases(*c),
            })
            .collect();
        let lexicon = Self::lexicon_for(&profiles);

        Ok(Self {
            min_input_length: config.min_input_length,
            match_mode: config.match_mode,
            priority: config.priority.clone(),
            sentiment_nudge: config.sentiment_nudge,
            profiles,
            lexicon,
        })
    }

    /// Positive markers come from the Positive set, negative from Distress
    fn lexicon_for(profiles: &[CategoryProfile]) -> SentimentLexicon {
        SentimentLexicon::new(
            profiles[Category::Positive.index()].keywords.iter(),
            profiles[Category::Distress.index()].keywords.iter(),
        )
    }

    pub fn min_input_length(&self) -> usize {
        self.min_input_length
    }

    pub fn priority(&self) -> &[Category] {
        &self.priority
    }

    pub fn profile(&self, category: Category) -> &CategoryProfile {
        &self.profiles[category.index()]
    }

    /// Trim and length-check. Returns the trimmed text.
    pub fn check_input<'a>(&self, text: &'a str) -> Result<&'a str> {
        let trimmed = text.trim();
        let length = trimmed.chars().count();
        if length < self.min_input_length {
            return Err(QoracleError::InsufficientInput {
                length,
                minimum: self.min_input_length,
            });
        }
        Ok(trimmed)
    }

    /// Category only; no randomness involved
    pub fn category_of(&self, text: &str) -> Result<Category> {
        let trimmed = self.check_input(text)?;
        Ok(self.match_category(&trimmed.to_lowercase()).0)
    }

    /// First-match-wins over the priority list, Neutral otherwise
    fn match_category(&self, lowered: &str) -> (Category, Vec<String>) {
        let tokens = sentiment::tokenize(lowered);

        for category in &self.priority {
            let matched = self.profile(*category).matches(lowered, &tokens, self.match_mode);
            if !matched.is_empty() {
                return (*category, matched);
            }
        }

        let neutral = self
            .profile(Category::Neutral)
            .matches(lowered, &tokens, self.match_mode);
        (Category::Neutral, neutral)
    }

    /// Classify text into a full reading.
    ///
    /// Fails only with `InsufficientInput`.
    pub fn classify<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Result<ClassificationResult> {
        let trimmed = self.check_input(text)?;
        let lowered = trimmed.to_lowercase();

        let (category, matched_keywords) = self.match_category(&lowered);
        let profile = self.profile(category);

        let mut score = profile.range.draw(rng);
        if self.sentiment_nudge {
            let ratio = self.lexicon.ratio(&lowered);
            score = sentiment::nudge(score, ratio, rng);
        }

        debug!(
            category = %category,
            score,
            keywords = ?matched_keywords,
            "resonance classified"
        );

        Ok(ClassificationResult {
            category,
            score,
            diagnosis: pick(profile.phrases.diagnosis, rng),
            shift: pick(profile.phrases.shift, rng),
            action: pick(profile.phrases.action, rng),
            matched_keywords,
        })
    }
}

impl Default for ResonanceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn pick<R: Rng + ?Sized>(options: &[&str], rng: &mut R) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

fn normalize_keywords(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
