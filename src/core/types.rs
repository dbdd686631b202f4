//! Core types - platform-independent data structures
//!
//! Competitor rows, results snapshots and the scroll phase shared by the
//! feed model, the highlight resolver and the scroll engine.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// BIB
// =============================================================================

/// Race number identifying a competitor; the stable key across snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bib(pub u32);

impl fmt::Display for Bib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bib as sent by the timing server
///
/// Upstream data is inconsistently typed: the same field may arrive as a
/// JSON number in one message and as a string in the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BibValue {
    Number(i64),
    Text(String),
}

impl BibValue {
    /// Trimmed textual form
    pub fn as_text(&self) -> String {
        match self {
            BibValue::Number(n) => n.to_string(),
            BibValue::Text(s) => s.trim().to_string(),
        }
    }

    /// Numeric form, parsed from the leading digits of text values
    pub fn as_number(&self) -> Option<i64> {
        match self {
            BibValue::Number(n) => Some(*n),
            BibValue::Text(s) => parse_leading_int(s),
        }
    }

    /// Convert to a competitor key (non-negative numbers only)
    pub fn to_bib(&self) -> Option<Bib> {
        self.as_number()
            .and_then(|n| u32::try_from(n).ok())
            .map(Bib)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BibValue::Text(s) if s.trim().is_empty())
    }

    /// Compare in both string and numeric form
    pub fn matches(&self, other: &BibValue) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.as_text() == other.as_text() {
            return true;
        }
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn matches_bib(&self, bib: Bib) -> bool {
        self.matches(&BibValue::Number(i64::from(bib.0)))
    }
}

impl From<Bib> for BibValue {
    fn from(bib: Bib) -> Self {
        BibValue::Number(i64::from(bib.0))
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

// =============================================================================
// COMPETITOR ROW
// =============================================================================

/// One line of the ranked results list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorRow {
    pub bib: Bib,
    /// Position in standings (1 = first); None for incomplete results
    pub rank: Option<u32>,
    pub name: String,
    pub nationality: String,
    pub total_time: String,
    pub penalty: String,
    pub behind_leader: String,
}

impl CompetitorRow {
    pub fn new(bib: u32, rank: Option<u32>, name: &str) -> Self {
        Self {
            bib: Bib(bib),
            rank,
            name: name.to_string(),
            nationality: String::new(),
            total_time: String::new(),
            penalty: String::new(),
            behind_leader: String::new(),
        }
    }
}

// =============================================================================
// RESULTS SNAPSHOT
// =============================================================================

/// One complete results payload; replaces the previous one atomically
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultsSnapshot {
    /// Display order (typically rank order)
    pub rows: Vec<CompetitorRow>,
    pub race_name: String,
    pub race_status: String,
    /// Bib the server wants emphasized
    pub highlight_bib: Option<BibValue>,
    /// Someone is on course or shown as current elsewhere
    pub is_athlete_current: bool,
}

impl ResultsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn position_of(&self, bib: Bib) -> Option<usize> {
        self.rows.iter().position(|r| r.bib == bib)
    }
}

// =============================================================================
// SCROLL PHASE
// =============================================================================

/// Autoscroll state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollPhase {
    #[default]
    Idle,
    Waiting,
    Scrolling,
    PausedAtBottom,
    ReturningToTop,
    HighlightView,
    Disabled,
}

impl ScrollPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ScrollPhase::Idle => "IDLE",
            ScrollPhase::Waiting => "WAITING",
            ScrollPhase::Scrolling => "SCROLLING",
            ScrollPhase::PausedAtBottom => "PAUSED_AT_BOTTOM",
            ScrollPhase::ReturningToTop => "RETURNING_TO_TOP",
            ScrollPhase::HighlightView => "HIGHLIGHT_VIEW",
            ScrollPhase::Disabled => "DISABLED",
        }
    }

    /// Phases in which a scroll animation depending on row geometry may be in flight
    pub fn defers_snapshots(self) -> bool {
        matches!(self, ScrollPhase::Scrolling | ScrollPhase::HighlightView)
    }

    /// Phases in which a deferred snapshot may be applied
    pub fn can_apply_snapshot(self) -> bool {
        matches!(
            self,
            ScrollPhase::Idle
                | ScrollPhase::Waiting
                | ScrollPhase::PausedAtBottom
                | ScrollPhase::Disabled
        )
    }
}

impl fmt::Display for ScrollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // BibValue tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_bib_value_string_and_number_match() {
        let text = BibValue::Text("42".to_string());
        let num = BibValue::Number(42);
        assert!(text.matches(&num));
        assert!(num.matches(&text));
        assert!(num.matches_bib(Bib(42)));
    }

    #[test]
    fn test_bib_value_whitespace_and_suffix() {
        let padded = BibValue::Text(" 7 ".to_string());
        assert_eq!(padded.as_number(), Some(7));
        assert_eq!(padded.to_bib(), Some(Bib(7)));

        // Leading digits are enough, like the display code upstream
        let suffixed = BibValue::Text("12a".to_string());
        assert_eq!(suffixed.as_number(), Some(12));
    }

    #[test]
    fn test_bib_value_empty_never_matches() {
        let empty = BibValue::Text(String::new());
        assert!(empty.is_empty());
        assert!(!empty.matches(&BibValue::Text(String::new())));
        assert_eq!(empty.to_bib(), None);
    }

    #[test]
    fn test_bib_value_negative_is_not_a_bib() {
        assert_eq!(BibValue::Number(-3).to_bib(), None);
        assert_eq!(BibValue::Text("-3".to_string()).as_number(), Some(-3));
    }

    #[test]
    fn test_bib_value_deserialize_untagged() {
        let v: Vec<BibValue> = serde_json::from_str(r#"[5, "6"]"#).unwrap();
        assert_eq!(v[0], BibValue::Number(5));
        assert_eq!(v[1], BibValue::Text("6".to_string()));
    }

    // -------------------------------------------------------------------------
    // Snapshot / phase tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_snapshot_position_of() {
        let snapshot = ResultsSnapshot {
            rows: vec![
                CompetitorRow::new(10, Some(1), "A"),
                CompetitorRow::new(77, Some(2), "B"),
            ],
            ..Default::default()
        };
        assert_eq!(snapshot.position_of(Bib(77)), Some(1));
        assert_eq!(snapshot.position_of(Bib(5)), None);
    }

    #[test]
    fn test_phase_snapshot_rules() {
        assert!(ScrollPhase::Scrolling.defers_snapshots());
        assert!(ScrollPhase::HighlightView.defers_snapshots());
        assert!(!ScrollPhase::Waiting.defers_snapshots());

        assert!(ScrollPhase::Idle.can_apply_snapshot());
        assert!(ScrollPhase::PausedAtBottom.can_apply_snapshot());
        assert!(!ScrollPhase::Scrolling.can_apply_snapshot());
        assert!(!ScrollPhase::ReturningToTop.can_apply_snapshot());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(ScrollPhase::PausedAtBottom.to_string(), "PAUSED_AT_BOTTOM");
    }
}
