//! Scoreboard constants - timings, thresholds, connection defaults
//!
//! All magic numbers used by the scroll engine, the highlight resolver and
//! the live data connection. Per-form-factor timing profiles are in the
//! `timing` module.

use std::time::Duration;

// =============================================================================
// SCROLL TIMINGS
// =============================================================================

/// Delay before the first page step after (re)entering WAITING
pub const INITIAL_DELAY: Duration = Duration::from_millis(3000);

/// Maximum time a highlighted competitor is held on screen
pub const HIGHLIGHT_VIEW_TIME: Duration = Duration::from_millis(5000);

/// Fixed wait for a smooth return-to-top animation to settle
pub const RETURN_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Default inactivity period after user input before autoscroll resumes
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_millis(5000);

// =============================================================================
// SCROLL GEOMETRY
// =============================================================================

/// Fraction of the viewport advanced per page (keeps an overlap between pages)
pub const PAGE_FILL_RATIO: f32 = 0.9;

/// Distance from the bottom (px) still considered "at bottom"
pub const BOTTOM_THRESHOLD_PX: f32 = 20.0;

/// Tolerance (px) when searching for the first visible row
pub const FIRST_VISIBLE_TOLERANCE_PX: f32 = 10.0;

// =============================================================================
// LIVE DATA CONNECTION
// =============================================================================

/// Default timing server endpoint
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8081/";

/// First reconnect delay; doubled per failed attempt
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for the reconnect delay
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Close reason sent when the caller asks for the disconnect
pub const INTENTIONAL_CLOSE_REASON: &str = "Intentional disconnect";

/// Poll period of the non-blocking socket loop
pub const SOCKET_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Capacity of the channel between the socket thread and the UI thread
pub const FEED_CHANNEL_CAPACITY: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_hold_is_five_seconds() {
        assert_eq!(HIGHLIGHT_VIEW_TIME.as_millis(), 5000);
    }

    #[test]
    fn test_reconnect_bounds() {
        assert!(RECONNECT_BASE_DELAY < RECONNECT_MAX_DELAY);
        assert_eq!(RECONNECT_MAX_DELAY.as_secs(), 30);
    }
}
