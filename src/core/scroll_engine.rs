//! Scroll engine - the autoscroll state machine
//!
//! Pages through the results list, pauses at the bottom, returns to the top,
//! diverts to a highlighted row on LED walls and parks while an athlete is
//! racing. All timing is driven by explicit `Instant`s passed in by the
//! caller; the engine owns exactly one pending timer at a time.
//!
//! Cycle:
//!
//! ```text
//! IDLE -> WAITING -> SCROLLING -> ... -> PAUSED_AT_BOTTOM -> RETURNING_TO_TOP -> WAITING
//! ```

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::constants::{
    BOTTOM_THRESHOLD_PX, FIRST_VISIBLE_TOLERANCE_PX, PAGE_FILL_RATIO, RETURN_SETTLE_DELAY,
};
use super::input::{NavKey, UserInput};
use super::timing::{FormFactor, ScrollTiming};
use super::traits::{ScrollBehavior, ScrollSurface};
use super::types::ScrollPhase;

/// Upper bound of timer actions run by one `tick`
const MAX_ACTIONS_PER_TICK: usize = 8;

// =============================================================================
// EVENTS / TIMER
// =============================================================================

/// UI feedback produced by engine operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    PhaseChanged { from: ScrollPhase, to: ScrollPhase },
    /// The engine moved the container
    Scrolled { top: f32 },
    /// Paging step could not run (no container or rows); retried later
    RetryScheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    /// Next paging step
    Page,
    /// Bottom pause over, go back to the top
    ReturnToTop,
    /// Return-to-top animation has settled
    Settle,
    /// Highlight hold over
    EndHighlight,
    /// User inactivity elapsed, or a deferred enable is due
    Resume,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    due: Instant,
    action: TimerAction,
}

// =============================================================================
// SCROLL ENGINE
// =============================================================================

#[derive(Debug)]
pub struct ScrollEngine {
    form_factor: FormFactor,
    timing: ScrollTiming,
    inactivity_timeout: Duration,

    phase: ScrollPhase,
    cursor: usize,
    row_total: usize,
    /// The single live cycle timer
    timer: Option<Timer>,

    /// Set by `disable()` (hidden or scrolling turned off)
    disabled: bool,
    athlete_current: bool,
    hold_until: Option<Instant>,
    user_paused: bool,
    torn_down: bool,

    events: Vec<EngineEvent>,
}

impl ScrollEngine {
    pub fn new(form_factor: FormFactor, timing: ScrollTiming, inactivity_timeout: Duration) -> Self {
        Self {
            form_factor,
            timing,
            inactivity_timeout,
            phase: ScrollPhase::Idle,
            cursor: 0,
            row_total: 0,
            timer: None,
            disabled: false,
            athlete_current: false,
            hold_until: None,
            user_paused: false,
            torn_down: false,
            events: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn form_factor(&self) -> FormFactor {
        self.form_factor
    }

    pub fn timing(&self) -> &ScrollTiming {
        &self.timing
    }

    pub fn is_user_paused(&self) -> bool {
        self.user_paused
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Autoscroll cycle is running (for the "auto-scrolling" indicator)
    pub fn is_auto_scrolling(&self) -> bool {
        !self.user_paused
            && matches!(
                self.phase,
                ScrollPhase::Waiting
                    | ScrollPhase::Scrolling
                    | ScrollPhase::PausedAtBottom
                    | ScrollPhase::ReturningToTop
            )
    }

    /// A snapshot may be applied to the rendered rows now
    pub fn accepts_snapshot(&self) -> bool {
        !self.phase.defers_snapshots()
    }

    /// When the live timer fires
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.due)
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Begin the cycle from IDLE; no-op in any other phase
    pub fn start<S>(&mut self, now: Instant, surface: &mut S) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down || self.phase != ScrollPhase::Idle || self.disabled {
            debug!(phase = %self.phase, disabled = self.disabled, "[SCROLL] Start ignored");
            return self.take_events();
        }
        if self.row_total == 0 {
            debug!("[SCROLL] No rows, staying idle");
            return self.take_events();
        }

        if self.racing_blocks() {
            self.park_at_top(surface);
        } else {
            self.enter_waiting(now, self.timing.initial_delay);
        }
        self.take_events()
    }

    /// Fire the live timer if it is due
    pub fn tick<S>(&mut self, now: Instant, surface: &mut S) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down {
            return Vec::new();
        }

        for _ in 0..MAX_ACTIONS_PER_TICK {
            let Some(timer) = self.timer.filter(|t| t.due <= now) else {
                break;
            };
            self.timer = None;

            match timer.action {
                TimerAction::Page => self.page_step(now, surface),
                TimerAction::ReturnToTop => self.return_to_top(now, surface),
                TimerAction::Settle => self.settle(now),
                TimerAction::EndHighlight => self.end_highlight(now, surface),
                TimerAction::Resume => self.resume(now, surface),
            }
        }

        self.take_events()
    }

    /// Halt, snap to the top and park in DISABLED
    pub fn disable<S>(&mut self, surface: &mut S) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down || (self.disabled && self.phase == ScrollPhase::Disabled) {
            return self.take_events();
        }

        info!(phase = %self.phase, "[SCROLL] Disabled");
        self.disabled = true;
        self.park_at_top(surface);
        self.take_events()
    }

    /// Leave DISABLED if the preconditions allow; otherwise stay parked
    pub fn enable<S>(&mut self, now: Instant, surface: &mut S) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down {
            return Vec::new();
        }
        let was_disabled = std::mem::replace(&mut self.disabled, false);

        match self.phase {
            ScrollPhase::Idle => return self.start(now, surface),
            ScrollPhase::Disabled => {}
            _ => return self.take_events(),
        }

        if was_disabled {
            info!("[SCROLL] Enabled");
        }
        self.try_resume(now);
        self.take_events()
    }

    /// Racing status changed (LED wall only)
    pub fn set_athlete_current<S>(
        &mut self,
        now: Instant,
        current: bool,
        surface: &mut S,
    ) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down || self.athlete_current == current {
            return self.take_events();
        }
        self.athlete_current = current;

        if !self.form_factor.is_led_wall() {
            return self.take_events();
        }

        if current {
            match self.phase {
                // The hold runs out first; its expiry parks the engine
                ScrollPhase::HighlightView | ScrollPhase::Disabled | ScrollPhase::Idle => {}
                _ => {
                    info!(phase = %self.phase, "[SCROLL] Athlete racing, parking at top");
                    self.park_at_top(surface);
                }
            }
        } else if self.phase == ScrollPhase::Disabled && !self.disabled {
            info!("[SCROLL] Racing finished");
            self.try_resume(now);
        }

        self.take_events()
    }

    /// LED wall: center `row_index` and hold it until `hold_until`
    pub fn show_highlight<S>(
        &mut self,
        now: Instant,
        row_index: usize,
        hold_until: Instant,
        surface: &mut S,
    ) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down || self.disabled || !self.form_factor.is_led_wall() {
            return self.take_events();
        }

        let (Some(metrics), Some(row)) = (surface.metrics(), surface.row_box(row_index)) else {
            warn!(row_index, "[SCROLL] Highlight row not available");
            return self.take_events();
        };

        let centered = row.offset_top - metrics.client_height / 2.0 + row.height / 2.0;
        let top = centered.clamp(0.0, metrics.max_scroll_top());

        self.user_paused = false;
        self.hold_until = Some(hold_until);
        self.scroll(surface, top, ScrollBehavior::Smooth);
        self.set_phase(ScrollPhase::HighlightView);
        self.timer = Some(Timer {
            due: hold_until.max(now),
            action: TimerAction::EndHighlight,
        });
        self.take_events()
    }

    /// Navigate the container and pause autoscroll until the user goes idle
    pub fn handle_input<S>(&mut self, now: Instant, input: UserInput, surface: &mut S) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down {
            return Vec::new();
        }
        let Some(metrics) = surface.metrics() else {
            return self.take_events();
        };

        let target = match input {
            UserInput::Key(NavKey::Home) => 0.0,
            UserInput::Key(NavKey::End) => metrics.scroll_height,
            UserInput::Key(NavKey::PageUp) => metrics.scroll_top - metrics.client_height,
            UserInput::Key(NavKey::PageDown) => metrics.scroll_top + metrics.client_height,
            UserInput::Wheel(delta) => metrics.scroll_top + delta,
        };
        let top = target.clamp(0.0, metrics.max_scroll_top());
        self.scroll(surface, top, ScrollBehavior::Instant);

        match self.phase {
            // Nothing to pause; a hold is never cut short by input
            ScrollPhase::Idle | ScrollPhase::Disabled | ScrollPhase::HighlightView => {}
            _ => {
                if !self.user_paused {
                    debug!(input = ?input, "[SCROLL] User input, autoscroll paused");
                }
                self.user_paused = true;
                self.set_phase(ScrollPhase::Waiting);
                self.timer = Some(Timer {
                    due: now + self.inactivity_timeout,
                    action: TimerAction::Resume,
                });
            }
        }
        self.take_events()
    }

    /// Rows were re-rendered from a new snapshot with `row_total` rows
    pub fn on_rows_changed<S>(&mut self, now: Instant, row_total: usize, surface: &mut S) -> Vec<EngineEvent>
    where
        S: ScrollSurface + ?Sized,
    {
        if self.torn_down {
            return Vec::new();
        }
        self.row_total = row_total;
        self.cursor = self.cursor.min(row_total.saturating_sub(1));

        match self.phase {
            ScrollPhase::Idle => return self.start(now, surface),
            ScrollPhase::PausedAtBottom => {
                let still_at_bottom = surface
                    .metrics()
                    .map_or(true, |m| m.is_at_bottom(BOTTOM_THRESHOLD_PX));
                if !still_at_bottom {
                    // List grew under the bottom pause; keep paging from here
                    let due = self.timer.map_or(now, |t| t.due);
                    debug!(rows = row_total, "[SCROLL] No longer at bottom, continuing");
                    self.set_phase(ScrollPhase::Waiting);
                    self.timer = Some(Timer {
                        due,
                        action: TimerAction::Page,
                    });
                }
            }
            _ => {}
        }
        self.take_events()
    }

    /// Cancel everything; the engine is inert afterwards
    pub fn teardown(&mut self) {
        if !self.torn_down {
            debug!(phase = %self.phase, "[SCROLL] Teardown");
        }
        self.timer = None;
        self.torn_down = true;
        self.events.clear();
    }

    // -------------------------------------------------------------------------
    // Timer actions
    // -------------------------------------------------------------------------

    fn page_step<S>(&mut self, now: Instant, surface: &mut S)
    where
        S: ScrollSurface + ?Sized,
    {
        let row_count = surface.row_count();
        let (Some(metrics), Some(first_row)) = (surface.metrics(), surface.row_box(0)) else {
            debug!(rows = row_count, "[SCROLL] Container or rows not ready, retrying");
            self.events.push(EngineEvent::RetryScheduled);
            self.timer = Some(Timer {
                due: now + self.timing.page_interval,
                action: TimerAction::Page,
            });
            return;
        };

        let fitting = if first_row.height > 0.0 {
            ((PAGE_FILL_RATIO * metrics.client_height) / first_row.height).floor() as usize
        } else {
            1
        };
        let rows_per_page = fitting.max(1);

        let last = row_count.saturating_sub(1);
        let next = (self.cursor + rows_per_page).min(last);

        if next >= last || metrics.is_at_bottom(BOTTOM_THRESHOLD_PX) {
            self.cursor = next;
            debug!(cursor = next, rows = row_count, "[SCROLL] Reached bottom");
            self.set_phase(ScrollPhase::PausedAtBottom);
            self.timer = Some(Timer {
                due: now + self.timing.bottom_pause,
                action: TimerAction::ReturnToTop,
            });
            return;
        }

        let Some(target) = surface.row_box(next) else {
            self.events.push(EngineEvent::RetryScheduled);
            self.timer = Some(Timer {
                due: now + self.timing.page_interval,
                action: TimerAction::Page,
            });
            return;
        };

        debug!(from = self.cursor, to = next, rows_per_page, "[SCROLL] Page");
        self.cursor = next;
        self.set_phase(ScrollPhase::Scrolling);
        self.scroll(surface, target.offset_top, ScrollBehavior::Smooth);
        self.timer = Some(Timer {
            due: now + self.timing.page_interval,
            action: TimerAction::Page,
        });
    }

    fn return_to_top<S>(&mut self, now: Instant, surface: &mut S)
    where
        S: ScrollSurface + ?Sized,
    {
        self.cursor = 0;
        self.scroll(surface, 0.0, ScrollBehavior::Smooth);
        self.set_phase(ScrollPhase::ReturningToTop);
        self.timer = Some(Timer {
            due: now + RETURN_SETTLE_DELAY,
            action: TimerAction::Settle,
        });
    }

    fn settle(&mut self, now: Instant) {
        self.cursor = 0;
        self.set_phase(ScrollPhase::Waiting);
        self.timer = Some(Timer {
            due: now + self.timing.page_interval,
            action: TimerAction::Page,
        });
    }

    fn end_highlight<S>(&mut self, now: Instant, surface: &mut S)
    where
        S: ScrollSurface + ?Sized,
    {
        self.hold_until = None;
        if self.racing_blocks() {
            info!("[SCROLL] Highlight over, athlete racing, parking");
            self.park_at_top(surface);
        } else {
            debug!("[SCROLL] Highlight over, returning to top");
            self.return_to_top(now, surface);
        }
    }

    fn resume<S>(&mut self, now: Instant, surface: &mut S)
    where
        S: ScrollSurface + ?Sized,
    {
        if self.user_paused {
            self.user_paused = false;
            let first_visible = surface
                .first_visible_row(FIRST_VISIBLE_TOLERANCE_PX)
                .unwrap_or(0);
            self.cursor = first_visible.min(self.row_total.saturating_sub(1));
            debug!(cursor = self.cursor, "[SCROLL] User idle, resuming");
            self.enter_waiting_from_cursor(now, self.timing.initial_delay);
        } else if self.phase == ScrollPhase::Disabled && !self.disabled {
            self.try_resume(now);
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// LED wall with an athlete on course
    fn racing_blocks(&self) -> bool {
        self.form_factor.is_led_wall() && self.athlete_current
    }

    fn hold_active(&self, now: Instant) -> Option<Instant> {
        self.hold_until.filter(|&until| until > now)
    }

    /// Re-enter the cycle from DISABLED if nothing blocks it
    fn try_resume(&mut self, now: Instant) {
        if self.row_total == 0 {
            self.timer = None;
            self.set_phase(ScrollPhase::Idle);
            return;
        }
        if self.racing_blocks() {
            debug!("[SCROLL] Resume blocked, athlete racing");
            return;
        }
        if let Some(until) = self.hold_active(now) {
            debug!("[SCROLL] Resume deferred until highlight hold ends");
            self.timer = Some(Timer {
                due: until,
                action: TimerAction::Resume,
            });
            return;
        }
        self.enter_waiting(now, self.timing.initial_delay);
    }

    fn enter_waiting(&mut self, now: Instant, delay: Duration) {
        self.cursor = 0;
        self.enter_waiting_from_cursor(now, delay);
    }

    fn enter_waiting_from_cursor(&mut self, now: Instant, delay: Duration) {
        self.user_paused = false;
        self.set_phase(ScrollPhase::Waiting);
        self.timer = Some(Timer {
            due: now + delay,
            action: TimerAction::Page,
        });
    }

    fn park_at_top<S>(&mut self, surface: &mut S)
    where
        S: ScrollSurface + ?Sized,
    {
        self.timer = None;
        self.user_paused = false;
        self.cursor = 0;
        self.scroll(surface, 0.0, ScrollBehavior::Instant);
        self.set_phase(ScrollPhase::Disabled);
    }

    fn scroll<S>(&mut self, surface: &mut S, top: f32, behavior: ScrollBehavior)
    where
        S: ScrollSurface + ?Sized,
    {
        surface.scroll_to(top, behavior);
        self.events.push(EngineEvent::Scrolled { top });
    }

    fn set_phase(&mut self, to: ScrollPhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        debug!(from = %from, to = %to, "[SCROLL] Phase changed");
        self.events.push(EngineEvent::PhaseChanged { from, to });
    }

    fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

// =============================================================================
// TESTS
// =============================================================================
