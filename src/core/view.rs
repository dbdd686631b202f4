//! In-memory results container
//!
//! `ListContainer` stands in for the scrollable results element: fixed-height
//! rows in a fixed-height viewport, with browser-like clamping of the scroll
//! position. The binary prints its visible window; tests use it as a
//! measurable `ScrollSurface`.

use std::fmt::Write as _;

use super::rows::RowView;
use super::timing::FormFactor;
use super::traits::{ContainerMetrics, ResultsView, RowBox, ScrollBehavior, ScrollSurface};
use super::types::ScrollPhase;

#[derive(Debug, Clone)]
pub struct ListContainer {
    rows: Vec<RowView>,
    row_height: f32,
    client_height: f32,
    scroll_top: f32,
    mounted: bool,
    last_behavior: Option<ScrollBehavior>,
}

impl ListContainer {
    pub fn new(row_height: f32, client_height: f32) -> Self {
        Self {
            rows: Vec::new(),
            row_height: row_height.max(1.0),
            client_height: client_height.max(0.0),
            scroll_top: 0.0,
            mounted: true,
            last_behavior: None,
        }
    }

    /// Container with the form factor's row height
    pub fn for_form_factor(form_factor: FormFactor, client_height: f32) -> Self {
        Self::new(form_factor.row_height(), client_height)
    }

    pub fn rows(&self) -> &[RowView] {
        &self.rows
    }

    pub fn scroll_top(&self) -> f32 {
        self.scroll_top
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn client_height(&self) -> f32 {
        self.client_height
    }

    pub fn last_behavior(&self) -> Option<ScrollBehavior> {
        self.last_behavior
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Unmounted containers report no metrics
    pub fn set_mounted(&mut self, mounted: bool) {
        self.mounted = mounted;
    }

    pub fn set_client_height(&mut self, client_height: f32) {
        self.client_height = client_height.max(0.0);
        self.clamp_scroll();
    }

    /// Rows intersecting the viewport
    pub fn visible_rows(&self) -> &[RowView] {
        if self.rows.is_empty() {
            return &self.rows;
        }
        let first = (self.scroll_top / self.row_height).floor() as usize;
        let last = ((self.scroll_top + self.client_height) / self.row_height).ceil() as usize;
        let first = first.min(self.rows.len());
        let last = last.clamp(first, self.rows.len());
        &self.rows[first..last]
    }

    fn content_height(&self) -> f32 {
        self.rows.len() as f32 * self.row_height
    }

    fn max_scroll_top(&self) -> f32 {
        (self.content_height() - self.client_height).max(0.0)
    }

    fn clamp_scroll(&mut self) {
        self.scroll_top = self.scroll_top.clamp(0.0, self.max_scroll_top());
    }
}

impl ScrollSurface for ListContainer {
    fn metrics(&self) -> Option<ContainerMetrics> {
        if !self.mounted {
            return None;
        }
        Some(ContainerMetrics {
            scroll_top: self.scroll_top,
            scroll_height: self.content_height().max(self.client_height),
            client_height: self.client_height,
        })
    }

    fn row_count(&self) -> usize {
        if self.mounted {
            self.rows.len()
        } else {
            0
        }
    }

    fn row_box(&self, index: usize) -> Option<RowBox> {
        (self.mounted && index < self.rows.len()).then(|| RowBox {
            offset_top: index as f32 * self.row_height,
            height: self.row_height,
        })
    }

    fn scroll_to(&mut self, top: f32, behavior: ScrollBehavior) {
        if !self.mounted {
            return;
        }
        // No animation in memory: smooth scrolls land immediately
        self.scroll_top = if top.is_finite() { top } else { 0.0 };
        self.last_behavior = Some(behavior);
        self.clamp_scroll();
    }
}

impl ResultsView for ListContainer {
    fn render(&mut self, rows: &[RowView]) {
        self.rows = rows.to_vec();
        self.clamp_scroll();
    }
}

// =============================================================================
// TEXT BOARD
// =============================================================================

/// Render the visible window as text
pub fn format_board(title: &str, phase: ScrollPhase, container: &ListContainer) -> String {
    let mut out = String::new();
    let indicator = match phase {
        ScrollPhase::Scrolling | ScrollPhase::Waiting | ScrollPhase::PausedAtBottom => " (auto)",
        _ => "",
    };
    let _ = writeln!(out, "{}  [{}{}]", title, phase, indicator);

    if !container.is_mounted() {
        return out;
    }

    for row in container.visible_rows() {
        let marker = if row.highlighted { '>' } else { ' ' };
        let penalty = if row.has_penalty {
            format!("*{}", row.penalty)
        } else {
            row.penalty.clone()
        };
        let _ = writeln!(
            out,
            "{}{:>4} {:>4} {:<28} {:<4} {:>4} {:>9} {:>8}",
            marker, row.rank, row.bib, row.name, row.nationality, penalty, row.total, row.behind
        );
    }

    out
}
