//! The Qoracle Card - terminal rendering of a reading.
//!
//! Layout:
//!
//! ```text
//! ── The Qoracle Card ─────────────────────────────
//!   Coherence 44%                Active Mode: The Stabilizer
//!
//!   Diagnosis:     High internal friction detected. ...
//!   Quantum Shift: Unkindness is the sin. ...
//!   Action:        Let us slow down. ...
//! ─────────────────────────────────────────────────
//! ```

use owo_colors::OwoColorize;
use qoracle_common::config::ColorMode;
use qoracle_common::history::SessionHistory;
use qoracle_common::ledger::LedgerRecord;
use qoracle_common::{Category, ClassificationResult};

const CARD_WIDTH: usize = 60;

/// Resolved color decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStyle {
    pub color: bool,
}

impl CardStyle {
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn resolve(mode: ColorMode, no_color: bool) -> Self {
        let color = !no_color
            && match mode {
                ColorMode::Auto => console::colors_enabled(),
                ColorMode::Basic => true,
                ColorMode::None => false,
            };
        Self { color }
    }

    fn paint(&self, text: &str, role: Role) -> String {
        if !self.color {
            return text.to_string();
        }
        match role {
            Role::Heading => text.bold().to_string(),
            Role::Dim => text.dimmed().to_string(),
            Role::Diagnosis => text.red().bold().to_string(),
            Role::Shift => text.blue().bold().to_string(),
            Role::Action => text.green().bold().to_string(),
            Role::Score(category) => match category {
                Category::Distress => text.bright_red().bold().to_string(),
                Category::Curiosity => text.bright_cyan().bold().to_string(),
                Category::Positive => text.bright_magenta().bold().to_string(),
                Category::Neutral => text.bright_white().bold().to_string(),
            },
        }
    }
}

#[derive(Clone, Copy)]
enum Role {
    Heading,
    Dim,
    Diagnosis,
    Shift,
    Action,
    Score(Category),
}

fn rule(title: Option<&str>) -> String {
    match title {
        Some(title) => {
            let prefix = format!("── {} ", title);
            let fill = CARD_WIDTH.saturating_sub(prefix.chars().count());
            format!("{}{}", prefix, "─".repeat(fill))
        }
        None => "─".repeat(CARD_WIDTH),
    }
}

/// Render a full card
pub fn render_card(result: &ClassificationResult, style: &CardStyle) -> String {
    let score = format!("{}%", result.score);
    let mode = format!("Active Mode: {}", result.mode_label());
    let gap = CARD_WIDTH.saturating_sub(2 + "Coherence ".len() + score.len() + mode.len()).max(2);

    let mut out = String::new();
    out.push_str(&style.paint(&rule(Some("The Qoracle Card")), Role::Heading));
    out.push('\n');
    out.push_str(&format!(
        "  {} {}{}{}\n\n",
        style.paint("Coherence", Role::Dim),
        style.paint(&score, Role::Score(result.category)),
        " ".repeat(gap),
        style.paint(&mode, Role::Dim),
    ));
    out.push_str(&format!(
        "  {}     {}\n",
        style.paint("Diagnosis:", Role::Diagnosis),
        result.diagnosis
    ));
    out.push_str(&format!(
        "  {} {}\n",
        style.paint("Quantum Shift:", Role::Shift),
        result.shift
    ));
    out.push_str(&format!(
        "  {}        {}\n",
        style.paint("Action:", Role::Action),
        result.action
    ));
    out.push_str(&style.paint(&rule(None), Role::Dim));
    out.push('\n');
    out
}

fn preview(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        input.to_string()
    } else {
        let cut: String = input.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// One line per session entry, oldest first
pub fn render_session_history(history: &SessionHistory, style: &CardStyle) -> String {
    if history.is_empty() {
        return "  (no readings yet)\n".to_string();
    }

    let mut out = String::new();
    if history.evicted_count() > 0 {
        out.push_str(&format!(
            "  (showing last {}, {} older dropped)\n",
            history.len(),
            history.evicted_count()
        ));
    }
    for (i, entry) in history.entries().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {} {:<15} {}\n",
            i + 1,
            style.paint(&format!("{:>3}%", entry.result.score), Role::Score(entry.result.category)),
            entry.result.mode_label(),
            preview(&entry.input, 40)
        ));
    }
    if let Some(avg) = history.average_score() {
        out.push_str(&format!("  average coherence {:.0}%\n", avg));
    }
    out
}

/// One line per ledger record
pub fn render_ledger_line(record: &LedgerRecord, style: &CardStyle) -> String {
    let category = Category::from_label(&record.reading.mode).unwrap_or(Category::Neutral);
    format!(
        "{}  {}  {:<15} {:<6} {}",
        style.paint(&record.timestamp.format("%Y-%m-%d %H:%M").to_string(), Role::Dim),
        style.paint(&format!("{:>3}%", record.reading.score), Role::Score(category)),
        record.reading.mode,
        record.backend,
        preview(&record.input, 48)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use qoracle_common::history::HistoryEntry;

    fn reading(category: Category, score: u8) -> ClassificationResult {
        ClassificationResult {
            category,
            score,
            diagnosis: "High internal friction detected.".to_string(),
            shift: "Move from reaction to observation.".to_string(),
            action: "Let us slow down.".to_string(),
            matched_keywords: Vec::new(),
        }
    }

    #[test]
    fn test_plain_card_has_every_field() {
        let card = render_card(&reading(Category::Distress, 44), &CardStyle::plain());
        assert!(card.contains("The Qoracle Card"));
        assert!(card.contains("Coherence 44%"));
        assert!(card.contains("Active Mode: The Stabilizer"));
        assert!(card.contains("Diagnosis:     High internal friction detected."));
        assert!(card.contains("Quantum Shift: Move from reaction to observation."));
        assert!(card.contains("Action:        Let us slow down."));
        assert!(!card.contains('\u{1b}'), "plain card must not contain escape codes");
    }

    #[test]
    fn test_colored_card_has_escape_codes() {
        let card = render_card(&reading(Category::Positive, 100), &CardStyle { color: true });
        assert!(card.contains('\u{1b}'));
        assert!(card.contains("The Mirror"));
    }

    #[test]
    fn test_resolve_respects_no_color() {
        assert!(!CardStyle::resolve(ColorMode::Basic, true).color);
        assert!(CardStyle::resolve(ColorMode::Basic, false).color);
        assert!(!CardStyle::resolve(ColorMode::None, false).color);
    }

    #[test]
    fn test_session_history_listing() {
        let mut history = SessionHistory::new(1);
        assert!(render_session_history(&history, &CardStyle::plain()).contains("no readings"));

        history.push(HistoryEntry::new("first", reading(Category::Distress, 40)));
        history.push(HistoryEntry::new("second offering", reading(Category::Curiosity, 90)));
        let listing = render_session_history(&history, &CardStyle::plain());
        assert!(listing.contains("1 older dropped"));
        assert!(listing.contains(" 90% The Companion"));
        assert!(listing.contains("second offering"));
        assert!(!listing.contains("first"));
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("abcdefghijkl", 8), "abcde...");
    }
}
