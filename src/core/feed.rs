//! Results feed model
//!
//! Folds inbound messages into the scoreboard's view of the race: the latest
//! results snapshot, who is currently on course, and whether the operator
//! wants the results list shown at all.

use tracing::{debug, warn};

use super::protocol::{ControlState, CurrentCompetitor, InboundMessage, OnCourseEntry, TopResults};
use super::types::{BibValue, CompetitorRow, ResultsSnapshot};

/// Observable consequence of one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum FeedChange {
    /// A new results list replaced the previous one
    Snapshot(ResultsSnapshot),
    /// Racing started or stopped (emitted only on change)
    AthleteCurrent(bool),
    /// Results list shown or hidden by the operator (emitted only on change)
    Visibility(bool),
}

#[derive(Debug)]
pub struct ResultsFeed {
    top: Option<TopResults>,
    current: Option<CurrentCompetitor>,
    on_course: Vec<OnCourseEntry>,
    control: ControlState,
    athlete_current: bool,
}

impl Default for ResultsFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsFeed {
    pub fn new() -> Self {
        Self {
            top: None,
            current: None,
            on_course: Vec::new(),
            control: ControlState::default(),
            athlete_current: false,
        }
    }

    pub fn apply(&mut self, message: InboundMessage) -> Vec<FeedChange> {
        let mut changes = Vec::new();

        match message {
            InboundMessage::Top(top) => {
                let snapshot = self.build_snapshot(&top);
                debug!(
                    rows = snapshot.len(),
                    race = %snapshot.race_name,
                    "[FEED] Results update"
                );
                self.top = Some(top);
                changes.push(FeedChange::Snapshot(snapshot));
            }
            InboundMessage::Comp(comp) => {
                self.current = Some(comp);
                self.refresh_athlete_current(&mut changes);
            }
            InboundMessage::OnCourse(entries) => {
                self.on_course = entries;
                self.refresh_athlete_current(&mut changes);
            }
            InboundMessage::Control(control) => {
                let was_visible = self.control.display_top;
                self.control = control;
                if self.control.display_top != was_visible {
                    debug!(visible = self.control.display_top, "[FEED] Results visibility");
                    changes.push(FeedChange::Visibility(self.control.display_top));
                }
            }
            InboundMessage::Other { kind } => {
                debug!(kind = %kind, "[FEED] Ignoring message");
            }
        }

        changes
    }

    /// Someone is on course or shown as the current competitor
    pub fn is_athlete_current(&self) -> bool {
        self.athlete_current
    }

    pub fn is_results_visible(&self) -> bool {
        self.control.display_top
    }

    /// Bibs of the on-course roster, used to suppress highlights
    pub fn on_course_bibs(&self) -> Vec<BibValue> {
        self.on_course
            .iter()
            .filter_map(|entry| entry.bib.clone())
            .collect()
    }

    pub fn current_competitor(&self) -> Option<&CurrentCompetitor> {
        self.current.as_ref()
    }

    pub fn race_name(&self) -> Option<&str> {
        self.top.as_ref().map(|t| t.race_name.as_str())
    }

    fn compute_athlete_current(&self) -> bool {
        let comp_active = self.current.as_ref().is_some_and(|c| c.is_active());
        comp_active || self.on_course.iter().any(|e| e.is_active())
    }

    fn refresh_athlete_current(&mut self, changes: &mut Vec<FeedChange>) {
        let now_current = self.compute_athlete_current();
        if now_current != self.athlete_current {
            self.athlete_current = now_current;
            debug!(current = now_current, "[FEED] Athlete current changed");
            changes.push(FeedChange::AthleteCurrent(now_current));
        }
    }

    fn build_snapshot(&self, top: &TopResults) -> ResultsSnapshot {
        let rows = top
            .list
            .iter()
            .filter_map(|entry| {
                let Some(bib) = entry.bib.as_ref().and_then(BibValue::to_bib) else {
                    warn!(name = %entry.name, bib = ?entry.bib, "[FEED] Dropping row without valid bib");
                    return None;
                };
                Some(CompetitorRow {
                    bib,
                    rank: entry.rank,
                    name: entry.name.clone(),
                    nationality: entry.nat.clone(),
                    total_time: entry.total.clone(),
                    penalty: entry.pen.clone(),
                    behind_leader: entry.behind.clone(),
                })
            })
            .collect();

        ResultsSnapshot {
            rows,
            race_name: top.race_name.clone(),
            race_status: top.race_status.clone(),
            highlight_bib: top.highlight_request().cloned(),
            is_athlete_current: self.athlete_current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::parse_inbound;
    use crate::core::types::Bib;

    fn apply_json(feed: &mut ResultsFeed, json: &str) -> Vec<FeedChange> {
        feed.apply(parse_inbound(json).unwrap())
    }

    // -------------------------------------------------------------------------
    // Snapshot tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_top_produces_full_snapshot() {
        let mut feed = ResultsFeed::new();
        let changes = apply_json(
            &mut feed,
            r#"{"msg":"top","data":{"RaceName":"C1w","HighlightBib":"5","list":[
                {"Bib":"5","Rank":"1","Name":"A","Total":"90.00"},
                {"Bib":6,"Rank":2,"Name":"B","Total":"91.00"}
            ]}}"#,
        );
        assert_eq!(changes.len(), 1);
        let FeedChange::Snapshot(snapshot) = &changes[0] else {
            panic!("Expected snapshot");
        };
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.rows[0].bib, Bib(5));
        assert_eq!(snapshot.rows[1].rank, Some(2));
        assert_eq!(snapshot.highlight_bib, Some(BibValue::Text("5".to_string())));
        assert_eq!(feed.race_name(), Some("C1w"));
    }

    #[test]
    fn test_rows_without_bib_dropped() {
        let mut feed = ResultsFeed::new();
        let changes = apply_json(
            &mut feed,
            r#"{"msg":"top","data":{"list":[{"Bib":"","Name":"X"},{"Bib":"abc"},{"Bib":3}]}}"#,
        );
        let FeedChange::Snapshot(snapshot) = &changes[0] else {
            panic!("Expected snapshot");
        };
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.rows[0].bib, Bib(3));
    }

    #[test]
    fn test_snapshot_carries_athlete_current() {
        let mut feed = ResultsFeed::new();
        apply_json(&mut feed, r#"{"msg":"comp","data":{"Bib":"9"}}"#);
        let changes = apply_json(&mut feed, r#"{"msg":"top","data":{"list":[]}}"#);
        let FeedChange::Snapshot(snapshot) = &changes[0] else {
            panic!("Expected snapshot");
        };
        assert!(snapshot.is_athlete_current);
    }

    // -------------------------------------------------------------------------
    // Athlete current tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_athlete_current_from_comp() {
        let mut feed = ResultsFeed::new();
        let changes = apply_json(&mut feed, r#"{"msg":"comp","data":{"Bib":"12"}}"#);
        assert_eq!(changes, vec![FeedChange::AthleteCurrent(true)]);
        assert!(feed.is_athlete_current());

        // Same state again: no change event
        let changes = apply_json(&mut feed, r#"{"msg":"comp","data":{"Bib":"13"}}"#);
        assert!(changes.is_empty());

        let changes = apply_json(&mut feed, r#"{"msg":"comp","data":{"Bib":""}}"#);
        assert_eq!(changes, vec![FeedChange::AthleteCurrent(false)]);
    }

    #[test]
    fn test_athlete_current_from_on_course() {
        let mut feed = ResultsFeed::new();
        let changes = apply_json(
            &mut feed,
            r#"{"msg":"oncourse","data":[{"Bib":"4","Total":"0:00.00"}]}"#,
        );
        assert!(changes.is_empty());
        assert!(!feed.is_athlete_current());
        assert_eq!(feed.on_course_bibs(), vec![BibValue::Text("4".to_string())]);

        let changes = apply_json(
            &mut feed,
            r#"{"msg":"oncourse","data":[{"Bib":"4","Total":"12.40"}]}"#,
        );
        assert_eq!(changes, vec![FeedChange::AthleteCurrent(true)]);
    }

    // -------------------------------------------------------------------------
    // Control tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_visibility_changes_only_on_edge() {
        let mut feed = ResultsFeed::new();
        assert!(feed.is_results_visible());

        let changes = apply_json(&mut feed, r#"{"msg":"control","data":{"displayTop":"1"}}"#);
        assert!(changes.is_empty());

        let changes = apply_json(&mut feed, r#"{"msg":"control","data":{"displayTop":"0"}}"#);
        assert_eq!(changes, vec![FeedChange::Visibility(false)]);
        assert!(!feed.is_results_visible());
    }

    #[test]
    fn test_other_messages_ignored() {
        let mut feed = ResultsFeed::new();
        let changes = apply_json(&mut feed, r#"{"msg":"daytime","data":{"time":"10:00"}}"#);
        assert!(changes.is_empty());
    }
}
