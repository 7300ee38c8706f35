/// Items revealed per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Distance from the bottom of the content, in pixels, at which the next page
/// is revealed.
pub const DEFAULT_THRESHOLD_PX: f64 = 500.0;

/// Grows the visible-item cap as the viewport nears the end of the content.
#[derive(Debug, Clone)]
pub struct LazyLoadController {
    page_size: usize,
    threshold_px: f64,
    visible_count: usize,
}

impl LazyLoadController {
    pub fn new(page_size: usize, threshold_px: f64) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            threshold_px: threshold_px.max(0.0),
            visible_count: page_size,
        }
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Proximity check. `distance_px` is content bottom minus viewport
    /// bottom. Returns true when another page was revealed.
    ///
    /// Never grows past `sequence_len` worth of pages: once every item is
    /// visible further calls are no-ops.
    pub fn on_scroll(&mut self, distance_px: f64, sequence_len: usize) -> bool {
        if distance_px >= self.threshold_px || self.visible_count >= sequence_len {
            return false;
        }
        self.visible_count += self.page_size;
        true
    }

    /// Back to the first page, for a new media sequence.
    pub fn reset(&mut self) {
        self.visible_count = self.page_size;
    }
}

impl Default for LazyLoadController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_THRESHOLD_PX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one_page() {
        let lazy = LazyLoadController::default();
        assert_eq!(lazy.visible_count(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_grows_only_near_bottom() {
        let mut lazy = LazyLoadController::new(10, 500.0);
        assert!(!lazy.on_scroll(800.0, 100));
        assert_eq!(lazy.visible_count(), 10);

        assert!(lazy.on_scroll(120.0, 100));
        assert_eq!(lazy.visible_count(), 20);
    }

    #[test]
    fn test_stops_at_sequence_length() {
        let mut lazy = LazyLoadController::new(10, 500.0);
        assert!(lazy.on_scroll(0.0, 25));
        assert!(lazy.on_scroll(0.0, 25));
        assert_eq!(lazy.visible_count(), 30);
        assert!(!lazy.on_scroll(0.0, 25));
        assert_eq!(lazy.visible_count(), 30);
    }

    #[test]
    fn test_monotonic_until_reset() {
        let mut lazy = LazyLoadController::new(4, 100.0);
        let mut last = lazy.visible_count();
        for distance in [500.0, 10.0, 300.0, 0.0, 99.0, 1000.0] {
            lazy.on_scroll(distance, 1_000);
            assert!(lazy.visible_count() >= last);
            last = lazy.visible_count();
        }
        lazy.reset();
        assert_eq!(lazy.visible_count(), 4);
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let mut lazy = LazyLoadController::new(0, 100.0);
        assert_eq!(lazy.visible_count(), 1);
        assert!(lazy.on_scroll(0.0, 5));
        assert_eq!(lazy.visible_count(), 2);
    }
}
