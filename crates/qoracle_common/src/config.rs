//! Qoracle Configuration
//!
//! Config file: ~/.config/qoracle/config.toml or /etc/qoracle/config.toml.
//! Every section is optional; missing keys fall back to defaults.

use crate::llm_client::LlmConfig;
use crate::resonance::{
    default_keywords, default_range, Category, MatchMode, ScoreRange, DEFAULT_MIN_INPUT_LENGTH,
    DEFAULT_PRIORITY,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment override for the config file location
pub const CONFIG_ENV: &str = "QORACLE_CONFIG";

// ============================================================================
// Per-category values
// ============================================================================

/// Built-in value for one category
pub trait CategoryDefault: Sized {
    fn category_default(category: Category) -> Self;
}

impl CategoryDefault for ScoreRange {
    fn category_default(category: Category) -> Self {
        default_range(category)
    }
}

impl CategoryDefault for Vec<String> {
    fn category_default(category: Category) -> Self {
        default_keywords(category)
    }
}

/// One value per category, keyed by name in TOML. Categories left out keep
/// their built-in value:
///
/// ```toml
/// [classifier.ranges]
/// distress = { min = 30, max = 60 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + CategoryDefault"))]
pub struct PerCategory<T> {
    pub distress: T,
    pub curiosity: T,
    pub positive: T,
    pub neutral: T,
}

impl<T> PerCategory<T> {
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            distress: f(Category::Distress),
            curiosity: f(Category::Curiosity),
            positive: f(Category::Positive),
            neutral: f(Category::Neutral),
        }
    }

    pub fn get(&self, category: Category) -> &T {
        match category {
            Category::Distress => &self.distress,
            Category::Curiosity => &self.curiosity,
            Category::Positive => &self.positive,
            Category::Neutral => &self.neutral,
        }
    }
}

impl<T: CategoryDefault> Default for PerCategory<T> {
    fn default() -> Self {
        Self::from_fn(T::category_default)
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Rule-based classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum trimmed input length in characters
    pub min_input_length: usize,

    /// substring (default) or whole_word
    pub match_mode: MatchMode,

    /// Evaluation order, first match wins. Neutral is always the fallback
    /// and must not appear here. Categories left out are never selected.
    pub priority: Vec<Category>,

    /// Apply the +/-5 sentiment nudge after the range draw
    pub sentiment_nudge: bool,

    pub ranges: PerCategory<ScoreRange>,

    pub keywords: PerCategory<Vec<String>>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_input_length: DEFAULT_MIN_INPUT_LENGTH,
            match_mode: MatchMode::default(),
            priority: DEFAULT_PRIORITY.to_vec(),
            sentiment_nudge: false,
            ranges: PerCategory::default(),
            keywords: PerCategory::default(),
        }
    }
}

impl ClassifierConfig {
    /// Check invariants the classifier relies on
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min_input_length == 0 {
            return Err("min_input_length must be at least 1".to_string());
        }

        for category in Category::ALL {
            let range = self.ranges.get(category);
            if !range.is_valid() {
                return Err(format!(
                    "score range for {} is invalid ({}): need min <= max <= 100",
                    category, range
                ));
            }
        }

        let mut seen = Vec::new();
        for category in &self.priority {
            if *category == Category::Neutral {
                return Err("neutral is the fallback and cannot be in priority".to_string());
            }
            if seen.contains(category) {
                return Err(format!("{} appears more than once in priority", category));
            }
            seen.push(*category);
        }

        Ok(())
    }
}

/// Which oracle answers a consult
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local keyword classifier
    #[default]
    Rules,
    /// External LLM service
    Llm,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Llm => "llm",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "rules" | "rule" | "local" => Ok(Self::Rules),
            "llm" | "remote" => Ok(Self::Llm),
            _ => anyhow::bail!("Invalid backend: '{}'. Valid values: rules, llm", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,

    /// Answer with the rule-based classifier when the LLM fails
    pub fallback_to_rules: bool,

    pub llm: LlmConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Rules,
            fallback_to_rules: true,
            llm: LlmConfig::default(),
        }
    }
}

/// Session history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Oldest entries are evicted beyond this
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Persistence ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub enabled: bool,

    /// Defaults to $XDG_DATA_HOME/qoracle/ledger.jsonl
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl LedgerConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            dirs::data_dir().map(|dir| dir.join("qoracle").join("ledger.jsonl"))
        })
    }
}

/// Color display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Auto-detect based on terminal capabilities
    #[default]
    Auto,
    /// Force basic ANSI colors
    Basic,
    /// No colors (plain text)
    None,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub color: ColorMode,

    /// The Pause: spinner time before a reading is shown (interactive only)
    pub pause_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            pause_ms: 1500,
        }
    }
}

// ============================================================================
// Main Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QoracleConfig {
    pub classifier: ClassifierConfig,
    pub backend: BackendConfig,
    pub history: HistoryConfig,
    pub ledger: LedgerConfig,
    pub output: OutputConfig,
}

impl Default for QoracleConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            backend: BackendConfig::default(),
            history: HistoryConfig::default(),
            ledger: LedgerConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl QoracleConfig {
    /// Get default user config path: ~/.config/qoracle/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
        Ok(config_dir.join("qoracle").join("config.toml"))
    }

    /// Get system config path: /etc/qoracle/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/qoracle/config.toml")
    }

    /// First config file that exists, if any.
    ///
    /// Priority:
    /// 1. $QORACLE_CONFIG
    /// 2. User config (~/.config/qoracle/config.toml)
    /// 3. System config (/etc/qoracle/config.toml)
    pub fn discover_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Some(user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Some(system_path);
        }

        None
    }

    /// Load from the discovered path, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::discover_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: QoracleConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier
            .validate()
            .map_err(|e| anyhow::anyhow!("[classifier] {}", e))?;
        if self.history.capacity == 0 {
            anyhow::bail!("[history] capacity must be at least 1");
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Save configuration to the given file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QoracleConfig::default();
        assert_eq!(config.classifier.min_input_length, 3);
        assert_eq!(config.classifier.match_mode, MatchMode::Substring);
        assert_eq!(config.classifier.priority, DEFAULT_PRIORITY.to_vec());
        assert_eq!(config.classifier.ranges.distress, ScoreRange::new(30, 60));
        assert_eq!(config.backend.kind, BackendKind::Rules);
        assert!(config.backend.fallback_to_rules);
        assert_eq!(config.history.capacity, 50);
        assert!(config.ledger.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = QoracleConfig::from_toml(
            r#"
            [classifier]
            min_input_length = 5
            match_mode = "whole_word"

            [backend]
            kind = "llm"
            "#,
        )
        .unwrap();

        assert_eq!(config.classifier.min_input_length, 5);
        assert_eq!(config.classifier.match_mode, MatchMode::WholeWord);
        assert_eq!(config.classifier.ranges.neutral, ScoreRange::new(70, 85));
        assert!(config.classifier.keywords.curiosity.contains(&"?".to_string()));
        assert_eq!(config.backend.kind, BackendKind::Llm);
        assert_eq!(config.backend.llm.timeout_secs, 20);
        assert_eq!(config.output.pause_ms, 1500);
    }

    #[test]
    fn test_ranges_and_priority_from_toml() {
        let config = QoracleConfig::from_toml(
            r#"
            [classifier]
            priority = ["positive", "distress"]

            [classifier.ranges]
            distress = { min = 10, max = 20 }
            curiosity = { min = 85, max = 98 }
            positive = { min = 100, max = 100 }
            neutral = { min = 70, max = 85 }
            "#,
        )
        .unwrap();

        assert_eq!(
            config.classifier.priority,
            vec![Category::Positive, Category::Distress]
        );
        assert_eq!(config.classifier.ranges.distress, ScoreRange::new(10, 20));
        assert_eq!(config.classifier.ranges.positive, ScoreRange::fixed(100));
    }

    #[test]
    fn test_single_category_override_keeps_the_rest() {
        let config = QoracleConfig::from_toml(
            r#"
            [classifier.ranges]
            distress = { min = 10, max = 20 }

            [classifier.keywords]
            distress = ["triste"]
            "#,
        )
        .unwrap();

        let classifier = &config.classifier;
        assert_eq!(classifier.ranges.distress, ScoreRange::new(10, 20));
        assert_eq!(classifier.ranges.curiosity, default_range(Category::Curiosity));
        assert_eq!(classifier.ranges.neutral, default_range(Category::Neutral));
        assert_eq!(classifier.keywords.distress, vec!["triste".to_string()]);
        assert_eq!(classifier.keywords.positive, default_keywords(Category::Positive));
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut config = ClassifierConfig::default();
        config.ranges.positive = ScoreRange::new(95, 101);
        assert!(config.validate().unwrap_err().contains("positive"));
    }

    #[test]
    fn test_neutral_priority_rejected() {
        let config = ClassifierConfig {
            priority: vec![Category::Distress, Category::Neutral],
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_priority_rejected() {
        let config = ClassifierConfig {
            priority: vec![Category::Distress, Category::Distress],
            ..ClassifierConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = QoracleConfig::from_toml("[history]\ncapacity = 0\n").unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("rules".parse::<BackendKind>().unwrap(), BackendKind::Rules);
        assert_eq!("LLM".parse::<BackendKind>().unwrap(), BackendKind::Llm);
        assert!("oracle".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_toml_serialization() {
        let toml = QoracleConfig::default().to_toml().unwrap();
        assert!(toml.contains("[classifier]"));
        assert!(toml.contains("[backend.llm]"));
        assert!(toml.contains("min_input_length = 3"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut original = QoracleConfig::default();
        original.classifier.sentiment_nudge = true;
        original.output.color = ColorMode::None;
        original.save_to(&path).unwrap();

        let loaded = QoracleConfig::load_from(&path).unwrap();
        assert!(loaded.classifier.sentiment_nudge);
        assert_eq!(loaded.output.color, ColorMode::None);
        assert_eq!(loaded.classifier, original.classifier);
    }

    #[test]
    fn test_ledger_section_keeps_enabled_default() {
        let config = QoracleConfig::from_toml("[ledger]\npath = \"/tmp/q.jsonl\"\n").unwrap();
        assert!(config.ledger.enabled);
    }

    #[test]
    fn test_explicit_ledger_path() {
        let ledger = LedgerConfig {
            enabled: true,
            path: Some(PathBuf::from("/tmp/q.jsonl")),
        };
        assert_eq!(ledger.resolved_path(), Some(PathBuf::from("/tmp/q.jsonl")));
    }
}
