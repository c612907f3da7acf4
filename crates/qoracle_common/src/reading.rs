//! Reading wire format.
//!
//! `{"score": 45, "diagnosis": "...", "shift": "...", "action": "...", "mode": "The Stabilizer"}`
//!
//! Used for `--json` output and as the contract the LLM backend must meet.

use crate::error::{QoracleError, Result};
use crate::resonance::{Category, ClassificationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema text handed to the external reasoning service
pub const READING_SCHEMA: &str = r#"{
  "score": integer 0-100 (coherence),
  "diagnosis": string (one sentence naming the condition),
  "shift": string (one sentence reframing it),
  "action": string (one concrete next step),
  "mode": one of "The Stabilizer" | "The Companion" | "The Mirror" | "The Observer"
}"#;

/// Wire shape of a reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub score: u8,
    pub diagnosis: String,
    pub shift: String,
    pub action: String,
    pub mode: String,
}

impl From<&ClassificationResult> for Reading {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            score: result.score,
            diagnosis: result.diagnosis.clone(),
            shift: result.shift.clone(),
            action: result.action.clone(),
            mode: result.mode_label().to_string(),
        }
    }
}

impl Reading {
    /// Validate and convert to a result. Keywords are unknown for external readings.
    pub fn into_result(self) -> Result<ClassificationResult> {
        let category = Category::from_label(&self.mode)
            .ok_or_else(|| QoracleError::InvalidReading(format!("unknown mode '{}'", self.mode)))?;
        if self.score > 100 {
            return Err(QoracleError::InvalidReading(format!(
                "score {} outside 0-100",
                self.score
            )));
        }
        Ok(ClassificationResult {
            category,
            score: self.score,
            diagnosis: non_empty("diagnosis", self.diagnosis)?,
            shift: non_empty("shift", self.shift)?,
            action: non_empty("action", self.action)?,
            matched_keywords: Vec::new(),
        })
    }
}

/// Parse a loosely-typed JSON object from an external service.
///
/// Models are sloppy with numbers, so `"45"` and `45.4` are accepted as scores.
pub fn parse_reading(value: &Value) -> Result<ClassificationResult> {
    let object = value
        .as_object()
        .ok_or_else(|| QoracleError::InvalidReading("reading is not a JSON object".to_string()))?;

    let score = object
        .get("score")
        .ok_or_else(|| QoracleError::InvalidReading("missing 'score'".to_string()))
        .and_then(parse_score)?;

    let text = |key: &str| -> Result<String> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| QoracleError::InvalidReading(format!("missing '{}'", key)))
    };

    Reading {
        score,
        diagnosis: text("diagnosis")?,
        shift: text("shift")?,
        action: text("action")?,
        mode: text("mode")?,
    }
    .into_result()
}

fn parse_score(value: &Value) -> Result<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| QoracleError::InvalidReading(format!("score is not a number: {}", value)))?;

    let rounded = raw.round();
    if !(0.0..=100.0).contains(&rounded) {
        return Err(QoracleError::InvalidReading(format!(
            "score {} outside 0-100",
            raw
        )));
    }
    Ok(rounded as u8)
}

fn non_empty(field: &str, value: String) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(QoracleError::InvalidReading(format!("empty '{}'", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stabilizer() -> Value {
        json!({
            "score": 42,
            "diagnosis": "Friction.",
            "shift": "Observe.",
            "action": "Breathe.",
            "mode": "The Stabilizer"
        })
    }

    #[test]
    fn test_parse_valid_reading() {
        let result = parse_reading(&stabilizer()).unwrap();
        assert_eq!(result.category, Category::Distress);
        assert_eq!(result.score, 42);
        assert_eq!(result.action, "Breathe.");
        assert!(result.matched_keywords.is_empty());
    }

    #[test]
    fn test_wire_keys() {
        let result = ClassificationResult {
            category: Category::Curiosity,
            score: 90,
            diagnosis: "d".to_string(),
            shift: "s".to_string(),
            action: "a".to_string(),
            matched_keywords: vec!["how".to_string()],
        };
        let value = serde_json::to_value(Reading::from(&result)).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["action", "diagnosis", "mode", "score", "shift"]);
        assert_eq!(value["mode"], "The Companion");
    }

    #[test]
    fn test_sloppy_scores_accepted() {
        let mut value = stabilizer();
        value["score"] = json!("55%");
        assert_eq!(parse_reading(&value).unwrap().score, 55);

        value["score"] = json!(70.6);
        assert_eq!(parse_reading(&value).unwrap().score, 71);
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let mut value = stabilizer();
        value["score"] = json!(140);
        assert!(matches!(parse_reading(&value), Err(QoracleError::InvalidReading(_))));

        value["score"] = json!(-3);
        assert!(parse_reading(&value).is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let mut value = stabilizer();
        value["mode"] = json!("The Prophet");
        let err = parse_reading(&value).unwrap_err();
        assert!(err.to_string().contains("The Prophet"));
    }

    #[test]
    fn test_semantic_mode_names_accepted() {
        let mut value = stabilizer();
        value["mode"] = json!("observer");
        assert_eq!(parse_reading(&value).unwrap().category, Category::Neutral);
    }

    #[test]
    fn test_missing_or_empty_fields_rejected() {
        let mut value = stabilizer();
        value.as_object_mut().unwrap().remove("shift");
        assert!(parse_reading(&value).unwrap_err().to_string().contains("shift"));

        let mut value = stabilizer();
        value["action"] = json!("   ");
        assert!(parse_reading(&value).unwrap_err().to_string().contains("action"));

        assert!(parse_reading(&json!(["not", "an", "object"])).is_err());
    }
}
