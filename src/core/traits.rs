//! Core traits - abstractions over the scroll container
//!
//! The scroll engine never touches a concrete widget. It reads geometry and
//! issues scroll commands through `ScrollSurface`; the row renderer writes
//! content through `ResultsView`. The in-memory `ListContainer` in the `view`
//! module is the implementation used by the binary and by most tests.

use super::rows::RowView;

// =============================================================================
// GEOMETRY
// =============================================================================

/// Scroll metrics of the results container, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerMetrics {
    pub scroll_top: f32,
    pub scroll_height: f32,
    pub client_height: f32,
}

impl ContainerMetrics {
    /// Largest reachable scroll position
    pub fn max_scroll_top(&self) -> f32 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    /// Within `threshold` pixels of the bottom
    pub fn is_at_bottom(&self, threshold: f32) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - threshold
    }
}

/// Vertical extent of one row inside the container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBox {
    pub offset_top: f32,
    pub height: f32,
}

impl RowBox {
    pub fn bottom(&self) -> f32 {
        self.offset_top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

// =============================================================================
// SCROLL SURFACE
// =============================================================================

/// Measurement and scroll-command surface of the results container
pub trait ScrollSurface {
    /// Container metrics, or None while the container is not mounted
    fn metrics(&self) -> Option<ContainerMetrics>;

    /// Number of rendered rows
    fn row_count(&self) -> usize;

    /// Geometry of row `index`
    fn row_box(&self, index: usize) -> Option<RowBox>;

    /// Scroll the container (never the page) to `top`
    fn scroll_to(&mut self, top: f32, behavior: ScrollBehavior);

    /// Index of the first row starting at or below the visible top
    ///
    /// Rows starting up to `tolerance` pixels above the top still count.
    /// Falls back to row 0; None while the container is not mounted.
    fn first_visible_row(&self, tolerance: f32) -> Option<usize> {
        let metrics = self.metrics()?;
        let index = (0..self.row_count())
            .find(|&i| {
                self.row_box(i)
                    .is_some_and(|b| b.offset_top >= metrics.scroll_top - tolerance)
            })
            .unwrap_or(0);
        Some(index)
    }
}

// =============================================================================
// RESULTS VIEW
// =============================================================================

/// Row renderer output: writes row content, never scroll positions
pub trait ResultsView: ScrollSurface {
    fn render(&mut self, rows: &[RowView]);
}

// =============================================================================
// TEST MOCKS
// =============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::Cell;

    /// Surface with uniform rows that records every scroll command
    pub struct MockSurface {
        pub rows: usize,
        pub row_height: f32,
        pub client_height: f32,
        pub mounted: Cell<bool>,
        pub scroll_top: f32,
        pub scrolls: Vec<(f32, ScrollBehavior)>,
    }

    impl MockSurface {
        pub fn new(rows: usize, row_height: f32, client_height: f32) -> Self {
            Self {
                rows,
                row_height,
                client_height,
                mounted: Cell::new(true),
                scroll_top: 0.0,
                scrolls: Vec::new(),
            }
        }

        pub fn unmounted(rows: usize) -> Self {
            let surface = Self::new(rows, 60.0, 300.0);
            surface.mounted.set(false);
            surface
        }

        pub fn last_scroll(&self) -> Option<f32> {
            self.scrolls.last().map(|(top, _)| *top)
        }
    }

    impl ScrollSurface for MockSurface {
        fn metrics(&self) -> Option<ContainerMetrics> {
            if !self.mounted.get() {
                return None;
            }
            Some(ContainerMetrics {
                scroll_top: self.scroll_top,
                scroll_height: self.rows as f32 * self.row_height,
                client_height: self.client_height,
            })
        }

        fn row_count(&self) -> usize {
            self.rows
        }

        fn row_box(&self, index: usize) -> Option<RowBox> {
            (index < self.rows).then(|| RowBox {
                offset_top: index as f32 * self.row_height,
                height: self.row_height,
            })
        }

        fn scroll_to(&mut self, top: f32, behavior: ScrollBehavior) {
            self.scroll_top = top;
            self.scrolls.push((top, behavior));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::MockSurface;
    use super::*;

    #[test]
    fn test_metrics_bottom_threshold() {
        let m = ContainerMetrics {
            scroll_top: 685.0,
            scroll_height: 1000.0,
            client_height: 300.0,
        };
        assert!(m.is_at_bottom(20.0));
        assert!(!m.is_at_bottom(10.0));
        assert_eq!(m.max_scroll_top(), 700.0);
    }

    #[test]
    fn test_first_visible_row_tolerance() {
        let mut surface = MockSurface::new(10, 60.0, 300.0);
        surface.scroll_to(125.0, ScrollBehavior::Instant);
        // Rows start at 0, 60, 120, 180, ...
        assert_eq!(surface.first_visible_row(0.0), Some(3));
        assert_eq!(surface.first_visible_row(10.0), Some(2));

        // Scrolled past every row start
        surface.scroll_to(900.0, ScrollBehavior::Instant);
        assert_eq!(surface.first_visible_row(10.0), Some(0));
    }

    #[test]
    fn test_unmounted_surface_has_no_metrics() {
        let surface = MockSurface::unmounted(5);
        assert!(surface.metrics().is_none());
        assert!(surface.first_visible_row(10.0).is_none());
    }
}
