//! WebSocket protocol types
//!
//! This module contains the JSON message types pushed by the timing server
//! to the scoreboard. The server is loosely typed: numeric fields may arrive
//! as strings, text fields as numbers, and optional fields as `null`. The
//! deserializers here normalize all of that at the boundary.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::types::BibValue;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON
    Json(serde_json::Error),
    /// Envelope without a message type
    MissingType,
    /// Known message type with a payload that does not match its schema
    Payload {
        kind: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Json(e) => write!(f, "Invalid JSON: {}", e),
            ProtocolError::MissingType => write!(f, "Message has no type"),
            ProtocolError::Payload { kind, source } => {
                write!(f, "Invalid '{}' payload: {}", kind, source)
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Json(e) => Some(e),
            ProtocolError::MissingType => None,
            ProtocolError::Payload { source, .. } => Some(source),
        }
    }
}

// =============================================================================
// LOOSE FIELD HELPERS
// =============================================================================

/// String field that may also be sent as a number or null
fn de_loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Positive integer that may be sent as a string; anything else is None
fn de_loose_rank<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let value = raw.and_then(|v| serde_json::from_value::<BibValue>(v).ok());
    Ok(value
        .and_then(|v| v.as_number())
        .and_then(|n| u32::try_from(n).ok())
        .filter(|&n| n > 0))
}

/// Bib that may be number, string or null; `""` becomes None
fn de_loose_bib<'de, D>(deserializer: D) -> Result<Option<BibValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let value = raw.and_then(|v| serde_json::from_value::<BibValue>(v).ok());
    Ok(value.filter(|v| !v.is_empty()))
}

/// Control flags are sent as "1"/"0"
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s.trim() == "1",
        Some(serde_json::Value::Number(n)) => n.as_i64() == Some(1),
        Some(serde_json::Value::Bool(b)) => b,
        _ => false,
    })
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// One row of the `top` results list, as sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    #[serde(rename = "Bib", default, deserialize_with = "de_loose_bib")]
    pub bib: Option<BibValue>,
    #[serde(rename = "Rank", default, deserialize_with = "de_loose_rank")]
    pub rank: Option<u32>,
    #[serde(rename = "Name", default, deserialize_with = "de_loose_string")]
    pub name: String,
    #[serde(rename = "Nat", default, deserialize_with = "de_loose_string")]
    pub nat: String,
    #[serde(rename = "Total", default, deserialize_with = "de_loose_string")]
    pub total: String,
    #[serde(rename = "Pen", default, deserialize_with = "de_loose_string")]
    pub pen: String,
    #[serde(rename = "Behind", default, deserialize_with = "de_loose_string")]
    pub behind: String,
}

/// `top` payload: the ranked results of the running race
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopResults {
    #[serde(rename = "RaceName", default, deserialize_with = "de_loose_string")]
    pub race_name: String,
    #[serde(rename = "RaceStatus", default, deserialize_with = "de_loose_string")]
    pub race_status: String,
    #[serde(rename = "HighlightBib", default, deserialize_with = "de_loose_bib")]
    pub highlight_bib: Option<BibValue>,
    #[serde(default)]
    pub list: Vec<ResultEntry>,
}

impl TopResults {
    /// Highlight request, with `0` treated as "no highlight"
    pub fn highlight_request(&self) -> Option<&BibValue> {
        self.highlight_bib
            .as_ref()
            .filter(|b| b.as_number() != Some(0))
    }
}

/// `comp` payload: the competitor currently shown as running
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentCompetitor {
    #[serde(rename = "Bib", default, deserialize_with = "de_loose_bib")]
    pub bib: Option<BibValue>,
    #[serde(rename = "Name", default, deserialize_with = "de_loose_string")]
    pub name: String,
    #[serde(rename = "Total", default, deserialize_with = "de_loose_string")]
    pub total: String,
}

impl CurrentCompetitor {
    pub fn is_active(&self) -> bool {
        self.bib.is_some()
    }
}

/// One entry of the `oncourse` roster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnCourseEntry {
    #[serde(rename = "Bib", default, deserialize_with = "de_loose_bib")]
    pub bib: Option<BibValue>,
    #[serde(rename = "Name", default, deserialize_with = "de_loose_string")]
    pub name: String,
    #[serde(rename = "Total", default, deserialize_with = "de_loose_string")]
    pub total: String,
}

impl OnCourseEntry {
    /// Athlete has a running time (not empty, not a zero placeholder)
    pub fn is_active(&self) -> bool {
        !matches!(self.total.trim(), "" | "0" | "0.00" | "0:00.00")
    }
}

/// `control` payload: which panels the operator wants shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    #[serde(rename = "displayTop", default = "default_display_top", deserialize_with = "de_flag")]
    pub display_top: bool,
}

fn default_display_top() -> bool {
    true
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            display_top: default_display_top(),
        }
    }
}

// =============================================================================
// INBOUND MESSAGES (server → scoreboard)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Top(TopResults),
    Comp(CurrentCompetitor),
    OnCourse(Vec<OnCourseEntry>),
    Control(ControlState),
    /// Any other message type (schedule, daytime, ...), ignored by the core
    Other { kind: String },
}

impl InboundMessage {
    pub fn kind(&self) -> &str {
        match self {
            InboundMessage::Top(_) => "top",
            InboundMessage::Comp(_) => "comp",
            InboundMessage::OnCourse(_) => "oncourse",
            InboundMessage::Control(_) => "control",
            InboundMessage::Other { kind } => kind,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type", alias = "msg", default)]
    kind: Option<String>,
    #[serde(alias = "data", default)]
    payload: serde_json::Value,
}

fn payload<T>(kind: &str, value: serde_json::Value) -> Result<T, ProtocolError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|source| ProtocolError::Payload {
        kind: kind.to_string(),
        source,
    })
}

/// Parse one text frame from the timing server
pub fn parse_inbound(text: &str) -> Result<InboundMessage, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Json)?;
    let kind = envelope
        .kind
        .filter(|k| !k.is_empty())
        .ok_or(ProtocolError::MissingType)?;

    let message = match kind.as_str() {
        "top" => InboundMessage::Top(payload(&kind, envelope.payload)?),
        "comp" => InboundMessage::Comp(payload(&kind, envelope.payload)?),
        "oncourse" => InboundMessage::OnCourse(payload(&kind, envelope.payload)?),
        "control" => InboundMessage::Control(payload(&kind, envelope.payload)?),
        _ => InboundMessage::Other { kind },
    };
    Ok(message)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Envelope tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_legacy_envelope_names() {
        let msg = parse_inbound(r#"{"msg": "comp", "data": {"Bib": "12", "Name": "DOE J"}}"#)
            .unwrap();
        match msg {
            InboundMessage::Comp(comp) => {
                assert_eq!(comp.bib, Some(BibValue::Text("12".to_string())));
                assert!(comp.is_active());
            }
            other => panic!("Expected Comp, got {:?}", other),
        }
    }

    #[test]
    fn test_type_payload_envelope() {
        let msg = parse_inbound(r#"{"type": "oncourse", "payload": []}"#).unwrap();
        assert_eq!(msg, InboundMessage::OnCourse(vec![]));
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let msg = parse_inbound(r#"{"msg": "schedule", "data": [{"x": 1}]}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Other {
                kind: "schedule".to_string()
            }
        );
        assert_eq!(msg.kind(), "schedule");
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_inbound("{not json"),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn test_missing_type() {
        assert!(matches!(
            parse_inbound(r#"{"data": {}}"#),
            Err(ProtocolError::MissingType)
        ));
    }

    #[test]
    fn test_bad_payload_shape() {
        let err = parse_inbound(r#"{"msg": "oncourse", "data": {"Bib": 1}}"#).unwrap_err();
        match err {
            ProtocolError::Payload { kind, .. } => assert_eq!(kind, "oncourse"),
            other => panic!("Expected Payload error, got {:?}", other),
        }
    }

    #[test]
    fn test_null_payload_is_default() {
        let msg = parse_inbound(r#"{"msg": "top", "data": null}"#).unwrap();
        assert_eq!(msg, InboundMessage::Top(TopResults::default()));
    }

    // -------------------------------------------------------------------------
    // Top results tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_top_results_mixed_types() {
        let json = r#"{"msg": "top", "data": {
            "RaceName": "K1m - Final",
            "RaceStatus": "In progress",
            "HighlightBib": "7",
            "list": [
                {"Bib": 7, "Rank": "1", "Name": "SMITH John", "Nat": "GBR", "Total": "91.02", "Pen": 2, "Behind": ""},
                {"Bib": "9", "Rank": 2, "Name": "NOVAK Jan", "Nat": "CZE", "Total": 93.5, "Pen": null, "Behind": "+2.48"},
                {"Bib": "", "Rank": "", "Name": "GHOST"}
            ]
        }}"#;
        let top = match parse_inbound(json).unwrap() {
            InboundMessage::Top(top) => top,
            other => panic!("Expected Top, got {:?}", other),
        };
        assert_eq!(top.race_name, "K1m - Final");
        assert_eq!(top.highlight_request(), Some(&BibValue::Text("7".to_string())));
        assert_eq!(top.list.len(), 3);

        assert_eq!(top.list[0].rank, Some(1));
        assert_eq!(top.list[0].pen, "2");
        assert_eq!(top.list[1].total, "93.5");
        assert_eq!(top.list[1].pen, "");
        assert_eq!(top.list[2].bib, None);
        assert_eq!(top.list[2].rank, None);
    }

    #[test]
    fn test_highlight_zero_means_none() {
        let top: TopResults = serde_json::from_str(r#"{"HighlightBib": 0, "list": []}"#).unwrap();
        assert!(top.highlight_bib.is_some());
        assert_eq!(top.highlight_request(), None);

        let top: TopResults = serde_json::from_str(r#"{"HighlightBib": "", "list": []}"#).unwrap();
        assert_eq!(top.highlight_request(), None);
    }

    // -------------------------------------------------------------------------
    // On-course / control tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_on_course_activity() {
        let entry = |total: &str| OnCourseEntry {
            bib: Some(BibValue::Number(3)),
            name: String::new(),
            total: total.to_string(),
        };
        assert!(!entry("").is_active());
        assert!(!entry("0").is_active());
        assert!(!entry("0.00").is_active());
        assert!(!entry("0:00.00").is_active());
        assert!(entry("12.34").is_active());
    }

    #[test]
    fn test_control_flags() {
        let msg = parse_inbound(r#"{"msg": "control", "data": {"displayTop": "0"}}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Control(ControlState { display_top: false })
        );

        let msg = parse_inbound(r#"{"msg": "control", "data": {"displayTop": "1"}}"#).unwrap();
        assert_eq!(msg, InboundMessage::Control(ControlState { display_top: true }));

        // Absent flag keeps the list visible
        let msg = parse_inbound(r#"{"msg": "control", "data": {}}"#).unwrap();
        assert_eq!(msg, InboundMessage::Control(ControlState::default()));
    }
}
