//! Scoreboard session - wires the results feed to the scroll engine
//!
//! ScoreboardSession folds inbound messages into the feed model, resolves the
//! highlight, drives the scroll engine and renders rows into a `ResultsView`.
//! Snapshots arriving while a scroll animation is in flight are buffered and
//! applied once the engine reaches a phase where row geometry may change.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::core::constants::DEFAULT_INACTIVITY_TIMEOUT;
use crate::core::feed::{FeedChange, ResultsFeed};
use crate::core::highlight::HighlightResolver;
use crate::core::input::UserInput;
use crate::core::io_traits::{ConnectionStatus, FeedEvent, FeedReceiver};
use crate::core::protocol::InboundMessage;
use crate::core::rows::render_rows;
use crate::core::scroll_engine::{EngineEvent, ScrollEngine};
use crate::core::timing::{FormFactor, ScrollTiming};
use crate::core::traits::{ResultsView, ScrollBehavior};
use crate::core::types::{Bib, ResultsSnapshot, ScrollPhase};

// =============================================================================
// SESSION EVENTS
// =============================================================================

/// Events emitted by ScoreboardSession for redraws and logging
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A snapshot was rendered
    SnapshotApplied { rows: usize },
    /// A snapshot arrived mid-scroll and was deferred
    SnapshotBuffered,
    /// The emphasized row changed
    HighlightChanged(Option<Bib>),
    PhaseChanged { from: ScrollPhase, to: ScrollPhase },
    /// The engine moved the container
    Scrolled { top: f32 },
    AthleteCurrentChanged(bool),
    VisibilityChanged(bool),
    ConnectionChanged {
        status: ConnectionStatus,
        error: Option<String>,
    },
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Display inputs owned by the configuration layer
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub form_factor: FormFactor,
    pub disable_scrolling: bool,
    pub inactivity_timeout: Duration,
    pub initial_delay_ms: Option<u64>,
    pub page_interval_ms: Option<u64>,
    pub bottom_pause_ms: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            form_factor: FormFactor::default(),
            disable_scrolling: false,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            initial_delay_ms: None,
            page_interval_ms: None,
            bottom_pause_ms: None,
        }
    }
}

impl SessionSettings {
    pub fn for_form_factor(form_factor: FormFactor) -> Self {
        Self {
            form_factor,
            ..Default::default()
        }
    }

    /// Timing profile with configured overrides applied
    pub fn timing(&self) -> ScrollTiming {
        ScrollTiming::for_form_factor(self.form_factor).with_overrides(
            self.initial_delay_ms,
            self.page_interval_ms,
            self.bottom_pause_ms,
        )
    }
}

// =============================================================================
// SCOREBOARD SESSION
// =============================================================================

pub struct ScoreboardSession {
    settings: SessionSettings,
    feed: ResultsFeed,
    /// Snapshot currently rendered
    displayed: Option<ResultsSnapshot>,
    /// Latest snapshot deferred during a scroll animation
    pending: Option<ResultsSnapshot>,
    resolver: HighlightResolver,
    engine: ScrollEngine,
    visible: bool,
    /// Highlight last rendered
    effective: Option<Bib>,
}

impl ScoreboardSession {
    pub fn new(settings: SessionSettings) -> Self {
        let engine = Self::build_engine(&settings);
        let resolver = HighlightResolver::new(settings.form_factor);
        Self {
            settings,
            feed: ResultsFeed::new(),
            displayed: None,
            pending: None,
            resolver,
            engine,
            visible: true,
            effective: None,
        }
    }

    fn build_engine(settings: &SessionSettings) -> ScrollEngine {
        ScrollEngine::new(
            settings.form_factor,
            settings.timing(),
            settings.inactivity_timeout,
        )
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn feed(&self) -> &ResultsFeed {
        &self.feed
    }

    pub fn engine(&self) -> &ScrollEngine {
        &self.engine
    }

    pub fn displayed(&self) -> Option<&ResultsSnapshot> {
        self.displayed.as_ref()
    }

    pub fn phase(&self) -> ScrollPhase {
        self.engine.phase()
    }

    pub fn effective_highlight(&self) -> Option<Bib> {
        self.effective
    }

    pub fn has_pending_snapshot(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_auto_scrolling(&self) -> bool {
        self.engine.is_auto_scrolling()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Next instant at which `tick` has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let hold = self.resolver.hold_until();
        match (self.engine.next_deadline(), hold) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    // -------------------------------------------------------------------------
    // Inputs
    // -------------------------------------------------------------------------

    /// Drain the feed receiver, then run due timers
    pub fn update<R, V>(&mut self, now: Instant, receiver: &mut R, view: &mut V) -> Vec<SessionEvent>
    where
        R: FeedReceiver + ?Sized,
        V: ResultsView + ?Sized,
    {
        let mut events = Vec::new();

        while let Some(event) = receiver.poll_event() {
            match event {
                FeedEvent::Status { status, error } => {
                    events.push(SessionEvent::ConnectionChanged { status, error });
                }
                FeedEvent::Message(message) => {
                    events.extend(self.handle_message(now, message, view));
                }
            }
        }

        events.extend(self.tick(now, view));
        events
    }

    pub fn handle_message<V>(&mut self, now: Instant, message: InboundMessage, view: &mut V) -> Vec<SessionEvent>
    where
        V: ResultsView + ?Sized,
    {
        let mut events = Vec::new();

        for change in self.feed.apply(message) {
            match change {
                FeedChange::Snapshot(snapshot) => {
                    if self.engine.accepts_snapshot() {
                        self.apply_snapshot(now, snapshot, view, &mut events);
                    } else {
                        debug!(phase = %self.engine.phase(), "[SESSION] Snapshot buffered");
                        self.pending = Some(snapshot);
                        events.push(SessionEvent::SnapshotBuffered);
                    }
                }
                FeedChange::AthleteCurrent(current) => {
                    events.push(SessionEvent::AthleteCurrentChanged(current));
                    let engine_events = self.engine.set_athlete_current(now, current, view);
                    self.push_engine_events(engine_events, &mut events);
                    self.resolve_highlight(now, view, &mut events);
                }
                FeedChange::Visibility(visible) => {
                    events.extend(self.set_visible(now, visible, view));
                }
            }
        }

        self.flush_pending(now, view, &mut events);
        events
    }

    /// Run due timers (highlight hold and engine cycle)
    pub fn tick<V>(&mut self, now: Instant, view: &mut V) -> Vec<SessionEvent>
    where
        V: ResultsView + ?Sized,
    {
        let mut events = Vec::new();

        if let Some(expiry) = self.resolver.tick(now, self.feed.is_athlete_current()) {
            if !expiry.resume_allowed {
                debug!(bib = %expiry.bib, "[SESSION] Highlight expired while racing");
            }
            self.sync_highlight(view, &mut events);
        }

        let engine_events = self.engine.tick(now, view);
        self.push_engine_events(engine_events, &mut events);
        self.flush_pending(now, view, &mut events);
        events
    }

    pub fn handle_input<V>(&mut self, now: Instant, input: UserInput, view: &mut V) -> Vec<SessionEvent>
    where
        V: ResultsView + ?Sized,
    {
        let mut events = Vec::new();
        let engine_events = self.engine.handle_input(now, input, view);
        self.push_engine_events(engine_events, &mut events);
        self.flush_pending(now, view, &mut events);
        events
    }

    /// Results list shown or hidden
    pub fn set_visible<V>(&mut self, now: Instant, visible: bool, view: &mut V) -> Vec<SessionEvent>
    where
        V: ResultsView + ?Sized,
    {
        let mut events = Vec::new();
        if self.visible == visible {
            return events;
        }
        self.visible = visible;
        info!(visible, "[SESSION] Results visibility changed");
        events.push(SessionEvent::VisibilityChanged(visible));

        self.sync_enabled(now, view, &mut events);
        self.flush_pending(now, view, &mut events);
        events
    }

    /// Scrolling preference changed; restarts the engine from IDLE
    pub fn set_disable_scrolling<V>(&mut self, now: Instant, disable: bool, view: &mut V) -> Vec<SessionEvent>
    where
        V: ResultsView + ?Sized,
    {
        if self.settings.disable_scrolling == disable {
            return Vec::new();
        }
        info!(disable, "[SESSION] Scrolling preference changed");
        self.settings.disable_scrolling = disable;
        self.restart(now, view)
    }

    /// Form factor changed; restarts the engine and resolver from IDLE
    pub fn set_form_factor<V>(&mut self, now: Instant, form_factor: FormFactor, view: &mut V) -> Vec<SessionEvent>
    where
        V: ResultsView + ?Sized,
    {
        if self.settings.form_factor == form_factor {
            return Vec::new();
        }
        info!(form_factor = %form_factor, "[SESSION] Form factor changed");
        self.settings.form_factor = form_factor;
        self.restart(now, view)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn restart<V>(&mut self, now: Instant, view: &mut V) -> Vec<SessionEvent>
    where
        V: ResultsView + ?Sized,
    {
        let mut events = Vec::new();
        let from = self.engine.phase();

        self.engine.teardown();
        self.engine = Self::build_engine(&self.settings);
        self.resolver = HighlightResolver::new(self.settings.form_factor);
        if from != ScrollPhase::Idle {
            events.push(SessionEvent::PhaseChanged {
                from,
                to: ScrollPhase::Idle,
            });
        }

        // Fresh engine is IDLE, so a deferred snapshot can go in first
        if let Some(snapshot) = self.pending.take() {
            self.displayed = Some(snapshot);
        }

        view.scroll_to(0.0, ScrollBehavior::Instant);
        events.push(SessionEvent::Scrolled { top: 0.0 });

        let engine_events =
            self.engine
                .set_athlete_current(now, self.feed.is_athlete_current(), view);
        self.push_engine_events(engine_events, &mut events);
        self.sync_enabled(now, view, &mut events);

        // Row count reaches the engine last so an enabled engine starts here
        if let Some(snapshot) = self.displayed.take() {
            self.apply_snapshot(now, snapshot, view, &mut events);
        } else {
            self.sync_highlight(view, &mut events);
        }
        events
    }

    fn apply_snapshot<V>(&mut self, now: Instant, snapshot: ResultsSnapshot, view: &mut V, events: &mut Vec<SessionEvent>)
    where
        V: ResultsView + ?Sized,
    {
        let rows = snapshot.len();
        self.displayed = Some(snapshot);
        self.render(view);
        events.push(SessionEvent::SnapshotApplied { rows });

        let engine_events = self.engine.on_rows_changed(now, rows, view);
        self.push_engine_events(engine_events, events);
        self.resolve_highlight(now, view, events);
    }

    fn flush_pending<V>(&mut self, now: Instant, view: &mut V, events: &mut Vec<SessionEvent>)
    where
        V: ResultsView + ?Sized,
    {
        if !self.engine.phase().can_apply_snapshot() {
            return;
        }
        if let Some(snapshot) = self.pending.take() {
            debug!(phase = %self.engine.phase(), "[SESSION] Applying buffered snapshot");
            self.apply_snapshot(now, snapshot, view, events);
        }
    }

    fn resolve_highlight<V>(&mut self, now: Instant, view: &mut V, events: &mut Vec<SessionEvent>)
    where
        V: ResultsView + ?Sized,
    {
        let Some(snapshot) = self.displayed.as_ref() else {
            return;
        };

        let on_course = self.feed.on_course_bibs();
        let decision = self.resolver.resolve(
            now,
            snapshot.highlight_bib.as_ref(),
            &on_course,
            &snapshot.rows,
            self.feed.is_athlete_current(),
        );
        let row_index = decision.started.and_then(|bib| snapshot.position_of(bib));

        self.sync_highlight(view, events);

        if decision.force_scroll {
            if let (Some(index), Some(until)) = (row_index, self.resolver.hold_until()) {
                let engine_events = self.engine.show_highlight(now, index, until, view);
                self.push_engine_events(engine_events, events);
            }
        }
    }

    /// Re-render if the resolver's highlight differs from what is shown
    fn sync_highlight<V>(&mut self, view: &mut V, events: &mut Vec<SessionEvent>)
    where
        V: ResultsView + ?Sized,
    {
        let effective = self.resolver.effective();
        if effective == self.effective {
            return;
        }
        self.effective = effective;
        self.render(view);
        events.push(SessionEvent::HighlightChanged(effective));
    }

    fn sync_enabled<V>(&mut self, now: Instant, view: &mut V, events: &mut Vec<SessionEvent>)
    where
        V: ResultsView + ?Sized,
    {
        let engine_events = if self.visible && !self.settings.disable_scrolling {
            self.engine.enable(now, view)
        } else {
            self.engine.disable(view)
        };
        self.push_engine_events(engine_events, events);
    }

    fn render<V>(&mut self, view: &mut V)
    where
        V: ResultsView + ?Sized,
    {
        let rows = match self.displayed.as_ref() {
            Some(snapshot) => render_rows(snapshot, self.effective),
            None => Vec::new(),
        };
        view.render(&rows);
    }

    fn push_engine_events(&self, engine_events: Vec<EngineEvent>, events: &mut Vec<SessionEvent>) {
        for event in engine_events {
            match event {
                EngineEvent::PhaseChanged { from, to } => {
                    events.push(SessionEvent::PhaseChanged { from, to });
                }
                EngineEvent::Scrolled { top } => events.push(SessionEvent::Scrolled { top }),
                EngineEvent::RetryScheduled => {}
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
