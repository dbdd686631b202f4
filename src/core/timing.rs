//! Display form factors and their autoscroll timing profiles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::constants::{HIGHLIGHT_VIEW_TIME, INITIAL_DELAY};

// =============================================================================
// FORM FACTOR
// =============================================================================

/// Physical display configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    #[default]
    Horizontal,
    Vertical,
    #[serde(rename = "ledwall")]
    LedWall,
    Custom,
}

impl FormFactor {
    pub fn as_str(self) -> &'static str {
        match self {
            FormFactor::Horizontal => "horizontal",
            FormFactor::Vertical => "vertical",
            FormFactor::LedWall => "ledwall",
            FormFactor::Custom => "custom",
        }
    }

    pub fn is_led_wall(self) -> bool {
        self == FormFactor::LedWall
    }

    /// Reference canvas size (width, height) in pixels
    pub fn canvas_size(self) -> (u32, u32) {
        match self {
            FormFactor::Horizontal => (1920, 1080),
            FormFactor::Vertical => (1080, 1920),
            FormFactor::LedWall => (768, 384),
            FormFactor::Custom => (1280, 720),
        }
    }

    /// Height of one results row in pixels
    pub fn row_height(self) -> f32 {
        match self {
            FormFactor::Horizontal => 80.0,
            FormFactor::Vertical => 48.0,
            FormFactor::LedWall | FormFactor::Custom => 60.0,
        }
    }
}

impl fmt::Display for FormFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormFactor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizontal" => Ok(FormFactor::Horizontal),
            "vertical" => Ok(FormFactor::Vertical),
            "ledwall" | "led_wall" | "led-wall" => Ok(FormFactor::LedWall),
            "custom" => Ok(FormFactor::Custom),
            other => Err(format!("Unknown display type: '{}'", other)),
        }
    }
}

// =============================================================================
// TIMING PROFILE
// =============================================================================

/// Autoscroll timings for one form factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTiming {
    pub initial_delay: Duration,
    pub page_interval: Duration,
    pub bottom_pause: Duration,
    pub highlight_view: Duration,
}

impl ScrollTiming {
    pub fn for_form_factor(form_factor: FormFactor) -> Self {
        let (page_ms, bottom_ms) = match form_factor {
            FormFactor::Horizontal | FormFactor::Custom => (8000, 2000),
            FormFactor::Vertical => (12000, 8000),
            FormFactor::LedWall => (3000, 1500),
        };

        Self {
            initial_delay: INITIAL_DELAY,
            page_interval: Duration::from_millis(page_ms),
            bottom_pause: Duration::from_millis(bottom_ms),
            highlight_view: HIGHLIGHT_VIEW_TIME,
        }
    }

    /// Apply optional millisecond overrides (from configuration)
    pub fn with_overrides(
        mut self,
        initial_delay_ms: Option<u64>,
        page_interval_ms: Option<u64>,
        bottom_pause_ms: Option<u64>,
    ) -> Self {
        if let Some(ms) = initial_delay_ms {
            self.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = page_interval_ms {
            self.page_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = bottom_pause_ms {
            self.bottom_pause = Duration::from_millis(ms);
        }
        self
    }
}
