//! Highlight resolver
//!
//! Decides which competitor row is emphasized right now, given the raw
//! highlight request from the results feed. Applies on-course suppression
//! and the fixed hold duration, and tells the scroll engine when an LED wall
//! has to jump to the highlighted row.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::constants::HIGHLIGHT_VIEW_TIME;
use super::timing::FormFactor;
use super::types::{Bib, BibValue, CompetitorRow};

/// Result of resolving one highlight request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HighlightDecision {
    /// Bib to emphasize after this resolution
    pub effective: Option<Bib>,
    /// Set when this resolution started a new hold
    pub started: Option<Bib>,
    /// LED wall only: scroll to the new highlight now
    pub force_scroll: bool,
}

/// Reported once when a hold runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightExpiry {
    pub bib: Bib,
    /// False while an athlete is racing; resumption is deferred
    pub resume_allowed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    bib: Bib,
    until: Instant,
}

#[derive(Debug)]
pub struct HighlightResolver {
    form_factor: FormFactor,
    hold_time: Duration,
    hold: Option<Hold>,
    /// Hold already served for this bib; not shown again until the request changes
    served: Option<Bib>,
    /// Expiry noticed during `resolve`, reported by the next `tick`
    unreported: Option<HighlightExpiry>,
}

impl HighlightResolver {
    pub fn new(form_factor: FormFactor) -> Self {
        Self::with_hold_time(form_factor, HIGHLIGHT_VIEW_TIME)
    }

    pub fn with_hold_time(form_factor: FormFactor, hold_time: Duration) -> Self {
        Self {
            form_factor,
            hold_time,
            hold: None,
            served: None,
            unreported: None,
        }
    }

    /// Bib currently emphasized
    pub fn effective(&self) -> Option<Bib> {
        self.hold.map(|h| h.bib)
    }

    /// End of the current hold
    pub fn hold_until(&self) -> Option<Instant> {
        self.hold.map(|h| h.until)
    }

    /// Resolve the feed's raw highlight request
    ///
    /// `rows` is the snapshot currently applied; a bib with no row is a no-op.
    pub fn resolve(
        &mut self,
        now: Instant,
        raw: Option<&BibValue>,
        on_course: &[BibValue],
        rows: &[CompetitorRow],
        athlete_current: bool,
    ) -> HighlightDecision {
        if let Some(expiry) = self.expire(now, athlete_current) {
            self.unreported = Some(expiry);
        }

        let requested = match raw {
            Some(value) if on_course.iter().any(|b| b.matches(value)) => {
                debug!(bib = %value.as_text(), "[HIGHLIGHT] Suppressed, athlete is on course");
                None
            }
            Some(value) => match value.to_bib() {
                Some(bib) if rows.iter().any(|r| r.bib == bib) => Some(bib),
                _ => {
                    debug!(bib = %value.as_text(), "[HIGHLIGHT] No matching row, ignoring");
                    return self.unchanged();
                }
            },
            None => None,
        };

        if self.served.is_some() && self.served != requested {
            self.served = None;
        }

        let Some(bib) = requested else {
            // LED walls finish the hold even when the server retracts it
            if !self.form_factor.is_led_wall() && self.hold.take().is_some() {
                debug!("[HIGHLIGHT] Request cleared, emphasis removed");
            }
            return self.unchanged();
        };

        if self.effective() == Some(bib) || self.served == Some(bib) {
            return self.unchanged();
        }

        let until = now + self.hold_time;
        self.hold = Some(Hold { bib, until });
        info!(bib = %bib, form_factor = %self.form_factor, "[HIGHLIGHT] New highlight");

        HighlightDecision {
            effective: Some(bib),
            started: Some(bib),
            force_scroll: self.form_factor.is_led_wall(),
        }
    }

    /// Expire the hold once its duration has elapsed
    pub fn tick(&mut self, now: Instant, athlete_current: bool) -> Option<HighlightExpiry> {
        self.unreported
            .take()
            .or_else(|| self.expire(now, athlete_current))
    }

    /// Drop any hold without reporting an expiry
    pub fn clear(&mut self) {
        self.hold = None;
        self.served = None;
        self.unreported = None;
    }

    fn unchanged(&self) -> HighlightDecision {
        HighlightDecision {
            effective: self.effective(),
            started: None,
            force_scroll: false,
        }
    }

    fn expire(&mut self, now: Instant, athlete_current: bool) -> Option<HighlightExpiry> {
        let hold = self.hold?;
        if now < hold.until {
            return None;
        }
        self.hold = None;
        self.served = Some(hold.bib);
        info!(bib = %hold.bib, athlete_current, "[HIGHLIGHT] Hold expired");
        Some(HighlightExpiry {
            bib: hold.bib,
            resume_allowed: !athlete_current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn rows() -> Vec<CompetitorRow> {
        vec![
            CompetitorRow::new(42, Some(1), "A"),
            CompetitorRow::new(77, Some(2), "B"),
            CompetitorRow::new(5, Some(3), "C"),
        ]
    }

    fn num(n: i64) -> BibValue {
        BibValue::Number(n)
    }

    fn text(s: &str) -> BibValue {
        BibValue::Text(s.to_string())
    }

    // -------------------------------------------------------------------------
    // Suppression tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_on_course_bib_suppressed() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        let decision = resolver.resolve(t0, Some(&text("42")), &[num(42)], &rows(), false);
        assert_eq!(decision, HighlightDecision::default());
        assert_eq!(resolver.effective(), None);
    }

    #[test]
    fn test_suppression_compares_string_and_number() {
        let mut resolver = HighlightResolver::new(FormFactor::Horizontal);
        let t0 = Instant::now();
        let decision = resolver.resolve(t0, Some(&num(42)), &[text("42")], &rows(), false);
        assert_eq!(decision.effective, None);
    }

    // -------------------------------------------------------------------------
    // Hold tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_led_highlight_forces_scroll_and_expires() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        let decision = resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        assert_eq!(decision.effective, Some(Bib(77)));
        assert_eq!(decision.started, Some(Bib(77)));
        assert!(decision.force_scroll);
        assert_eq!(resolver.hold_until(), Some(t0 + ms(5000)));

        assert_eq!(resolver.tick(t0 + ms(4999), false), None);
        let expiry = resolver.tick(t0 + ms(5000), false).unwrap();
        assert_eq!(expiry.bib, Bib(77));
        assert!(expiry.resume_allowed);
        assert_eq!(resolver.effective(), None);
    }

    #[test]
    fn test_non_led_highlight_is_visual_only() {
        let mut resolver = HighlightResolver::new(FormFactor::Vertical);
        let t0 = Instant::now();
        let decision = resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        assert_eq!(decision.effective, Some(Bib(77)));
        assert!(!decision.force_scroll);
    }

    #[test]
    fn test_same_bib_does_not_reset_hold() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        let decision = resolver.resolve(t0 + ms(3000), Some(&text("77")), &[], &rows(), false);
        assert_eq!(decision.started, None);
        assert!(!decision.force_scroll);
        assert_eq!(resolver.hold_until(), Some(t0 + ms(5000)));
    }

    #[test]
    fn test_different_bib_resets_hold() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        let decision = resolver.resolve(t0 + ms(3000), Some(&num(5)), &[], &rows(), false);
        assert_eq!(decision.started, Some(Bib(5)));
        assert!(decision.force_scroll);
        assert_eq!(resolver.hold_until(), Some(t0 + ms(8000)));
    }

    #[test]
    fn test_expired_bib_not_shown_again_until_request_changes() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        assert!(resolver.tick(t0 + ms(5000), false).is_some());

        let decision = resolver.resolve(t0 + ms(6000), Some(&num(77)), &[], &rows(), false);
        assert_eq!(decision.effective, None);

        // Server clears, then highlights the same athlete again (second run)
        resolver.resolve(t0 + ms(7000), None, &[], &rows(), false);
        let decision = resolver.resolve(t0 + ms(8000), Some(&num(77)), &[], &rows(), false);
        assert_eq!(decision.started, Some(Bib(77)));
    }

    #[test]
    fn test_expiry_noticed_in_resolve_is_reported_by_tick() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        let decision = resolver.resolve(t0 + ms(5500), Some(&num(77)), &[], &rows(), true);
        assert_eq!(decision.effective, None);

        let expiry = resolver.tick(t0 + ms(5500), true).unwrap();
        assert!(!expiry.resume_allowed);
        assert_eq!(resolver.tick(t0 + ms(5600), true), None);
    }

    // -------------------------------------------------------------------------
    // Retraction / unknown bib tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_led_retraction_keeps_hold() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        let decision = resolver.resolve(t0 + ms(1000), None, &[], &rows(), false);
        assert_eq!(decision.effective, Some(Bib(77)));
        assert!(resolver.tick(t0 + ms(5000), false).is_some());
    }

    #[test]
    fn test_non_led_retraction_clears() {
        let mut resolver = HighlightResolver::new(FormFactor::Horizontal);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        let decision = resolver.resolve(t0 + ms(1000), None, &[], &rows(), false);
        assert_eq!(decision.effective, None);
        assert_eq!(resolver.tick(t0 + ms(5000), false), None);
    }

    #[test]
    fn test_unknown_bib_is_noop() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        let decision = resolver.resolve(t0 + ms(1000), Some(&num(999)), &[], &rows(), false);
        assert_eq!(decision.effective, Some(Bib(77)));
        assert_eq!(decision.started, None);
        assert!(!decision.force_scroll);
        assert_eq!(resolver.hold_until(), Some(t0 + ms(5000)));
    }

    #[test]
    fn test_racing_defers_resumption() {
        let mut resolver = HighlightResolver::new(FormFactor::LedWall);
        let t0 = Instant::now();
        resolver.resolve(t0, Some(&num(77)), &[], &rows(), false);
        let expiry = resolver.tick(t0 + ms(5000), true).unwrap();
        assert!(!expiry.resume_allowed);
    }
}
