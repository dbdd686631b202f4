//! I/O traits for the live data feed
//!
//! These traits abstract the network side of the scoreboard so the session
//! and app loop can be driven by scripted events in tests.

use std::fmt;

use crate::core::protocol::InboundMessage;

// =============================================================================
// CONNECTION STATUS
// =============================================================================

/// Connection status of the timing server link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected and not trying to
    #[default]
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    /// Socket open
    Connected,
    /// Connection lost, waiting for the next attempt
    Reconnecting,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Reconnecting => "reconnecting",
        };
        f.write_str(label)
    }
}

// =============================================================================
// FEED EVENTS
// =============================================================================

/// Events delivered from the connection to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Connection status changed; `error` describes why a link went down
    Status {
        status: ConnectionStatus,
        error: Option<String>,
    },
    /// A parsed message from the timing server
    Message(InboundMessage),
}

// =============================================================================
// I/O TRAITS
// =============================================================================

/// Trait for receiving feed events
pub trait FeedReceiver {
    /// Poll for the next event (non-blocking)
    ///
    /// Returns `Some(event)` if an event is available, `None` otherwise.
    fn poll_event(&mut self) -> Option<FeedEvent>;

    /// Current connection status
    fn status(&self) -> ConnectionStatus;
}

// =============================================================================
// MOCK IMPLEMENTATIONS FOR TESTING
// =============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted feed: events queued by the test are returned in order
    pub struct MockFeed {
        pub status: RefCell<ConnectionStatus>,
        pub pending_events: RefCell<VecDeque<FeedEvent>>,
    }

    impl MockFeed {
        pub fn new() -> Self {
            Self {
                status: RefCell::new(ConnectionStatus::Connected),
                pending_events: RefCell::new(VecDeque::new()),
            }
        }

        pub fn queue_event(&self, event: FeedEvent) {
            if let FeedEvent::Status { status, .. } = &event {
                *self.status.borrow_mut() = *status;
            }
            self.pending_events.borrow_mut().push_back(event);
        }

        /// Queue a raw JSON frame, parsed the way the connection parses it
        pub fn queue_json(&self, json: &str) {
            let message = crate::core::protocol::parse_inbound(json)
                .unwrap_or_else(|e| panic!("bad test frame {}: {}", json, e));
            self.queue_event(FeedEvent::Message(message));
        }

        pub fn pending(&self) -> usize {
            self.pending_events.borrow().len()
        }
    }

    impl Default for MockFeed {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FeedReceiver for MockFeed {
        fn poll_event(&mut self) -> Option<FeedEvent> {
            self.pending_events.borrow_mut().pop_front()
        }

        fn status(&self) -> ConnectionStatus {
            *self.status.borrow()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
