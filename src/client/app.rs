//! Scoreboard app - main orchestrator for the text scoreboard
//!
//! Owns the connection, the feed channel, the session and the in-memory
//! results container, and tells the caller when the board needs a redraw.

use std::time::Instant;

use tracing::{info, warn};

use crate::core::format::category_from_race_name;
use crate::core::input::UserInput;
use crate::core::io_traits::ConnectionStatus;
use crate::core::session::{ScoreboardSession, SessionEvent};
use crate::core::view::{format_board, ListContainer};

use super::config::Config;
use super::connection::{FeedChannel, LiveConnection};

// =============================================================================
// SCOREBOARD APP
// =============================================================================

pub struct ScoreboardApp {
    config: Config,
    connection: LiveConnection,
    feed: FeedChannel,
    session: ScoreboardSession,
    view: ListContainer,
    status: ConnectionStatus,
}

impl ScoreboardApp {
    pub fn new(config: Config) -> Self {
        let connection = LiveConnection::new(config.server.auto_reconnect);
        // Listeners first, so nothing sent after the open is missed
        let feed = FeedChannel::attach(&connection);
        let session = ScoreboardSession::new(config.session_settings());
        let view = ListContainer::new(config.display.row_height(), config.display.viewport_height());

        Self {
            config,
            connection,
            feed,
            session,
            view,
            status: ConnectionStatus::Disconnected,
        }
    }

    /// Open the link to the configured server
    pub fn start(&self) {
        let url = self.config.server.ws_url();
        info!(url = %url, form_factor = %self.config.display.form_factor, "[APP] Starting");
        self.connection.connect(&url);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connection(&self) -> &LiveConnection {
        &self.connection
    }

    pub fn session(&self) -> &ScoreboardSession {
        &self.session
    }

    pub fn view(&self) -> &ListContainer {
        &self.view
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Drain the feed and run due timers; true if the board changed
    pub fn update(&mut self, now: Instant) -> bool {
        let events = self.session.update(now, &mut self.feed, &mut self.view);
        self.handle_events(&events)
    }

    pub fn handle_input(&mut self, now: Instant, input: UserInput) -> bool {
        let events = self.session.handle_input(now, input, &mut self.view);
        self.handle_events(&events)
    }

    pub fn set_disable_scrolling(&mut self, now: Instant, disable: bool) -> bool {
        let events = self.session.set_disable_scrolling(now, disable, &mut self.view);
        self.handle_events(&events)
    }

    fn handle_events(&mut self, events: &[SessionEvent]) -> bool {
        let mut redraw = false;

        for event in events {
            match event {
                SessionEvent::ConnectionChanged { status, error } => {
                    match error {
                        Some(e) => warn!(status = %status, error = %e, "[APP] Connection changed"),
                        None => info!(status = %status, "[APP] Connection changed"),
                    }
                    self.status = *status;
                    redraw = true;
                }
                SessionEvent::SnapshotBuffered => {}
                _ => redraw = true,
            }
        }

        redraw
    }

    /// Board title: category, race name and link state
    pub fn title(&self) -> String {
        let race = self
            .session
            .displayed()
            .map(|s| s.race_name.as_str())
            .unwrap_or("");

        let mut title = match category_from_race_name(race) {
            Some(category) => format!("{} | {}", category, race),
            None if race.is_empty() => "Results".to_string(),
            None => race.to_string(),
        };

        title.push_str(&format!(" | {}", self.status));
        if let Some(last) = self.connection.last_message_time() {
            let local = last.with_timezone(&chrono::Local);
            title.push_str(&format!(" @ {}", local.format("%H:%M:%S")));
        }
        title
    }

    /// Text rendering of the visible window
    pub fn render(&self) -> String {
        if !self.session.is_visible() {
            return format!("{}\n", self.title());
        }
        format_board(&self.title(), self.session.phase(), &self.view)
    }
}

impl Drop for ScoreboardApp {
    fn drop(&mut self) {
        self.connection.disconnect();
    }
}

// =============================================================================
// TESTS
// =============================================================================
