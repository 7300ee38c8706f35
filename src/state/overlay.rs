use crate::state::AutoscrollController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Closed,
    Open {
        index: usize,
        was_scrolling: bool,
        loading: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

/// Full-screen viewer state: which sequence index is shown and whether
/// autoscroll has to be resumed on close.
///
/// Every open or move starts a new load generation. The view tags its decode
/// request with the generation and reports completion with it, so a slow
/// decode for an item the user already navigated away from is ignored.
#[derive(Debug, Clone)]
pub struct OverlayController {
    state: OverlayState,
    generation: u64,
}

impl OverlayController {
    pub fn new() -> Self {
        Self {
            state: OverlayState::Closed,
            generation: 0,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, OverlayState::Open { .. })
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            OverlayState::Open { index, .. } => Some(index),
            OverlayState::Closed => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, OverlayState::Open { loading: true, .. })
    }

    /// Close and open-elsewhere controls are only offered once the media is
    /// ready.
    pub fn controls_visible(&self) -> bool {
        matches!(self.state, OverlayState::Open { loading: false, .. })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Shows `index`, pausing autoscroll. Opening over an already open
    /// overlay keeps the first resume flag. Returns the load generation.
    pub fn open(&mut self, index: usize, autoscroll: &mut AutoscrollController) -> u64 {
        let was_scrolling = match self.state {
            OverlayState::Open { was_scrolling, .. } => was_scrolling,
            OverlayState::Closed => autoscroll.is_scrolling(),
        };
        autoscroll.stop();

        self.generation += 1;
        self.state = OverlayState::Open {
            index,
            was_scrolling,
            loading: true,
        };
        self.generation
    }

    /// Returns false if the overlay was already closed.
    pub fn close(&mut self, autoscroll: &mut AutoscrollController) -> bool {
        let OverlayState::Open { was_scrolling, .. } = self.state else {
            return false;
        };
        self.state = OverlayState::Closed;
        self.generation += 1;
        if was_scrolling {
            autoscroll.start();
        }
        true
    }

    /// Moves one step through a sequence of `len` items. No wraparound:
    /// returns false at either end or while closed.
    pub fn navigate(&mut self, direction: NavDirection, len: usize) -> bool {
        let OverlayState::Open {
            index,
            was_scrolling,
            ..
        } = self.state
        else {
            return false;
        };

        let target = match direction {
            NavDirection::Previous => index.checked_sub(1),
            NavDirection::Next => Some(index + 1).filter(|next| *next < len),
        };
        let Some(target) = target else {
            return false;
        };

        self.generation += 1;
        self.state = OverlayState::Open {
            index: target,
            was_scrolling,
            loading: true,
        };
        true
    }

    /// Marks the media of `generation` as ready. Stale generations are
    /// ignored and return false.
    pub fn media_loaded(&mut self, generation: u64) -> bool {
        match &mut self.state {
            OverlayState::Open { loading, .. } if generation == self.generation && *loading => {
                *loading = false;
                true
            }
            _ => false,
        }
    }

    /// Follows the open item into a rebuilt sequence. `None` means the item
    /// no longer exists and the overlay is closed.
    pub fn remap(&mut self, new_index: Option<usize>, autoscroll: &mut AutoscrollController) {
        let OverlayState::Open {
            was_scrolling,
            loading,
            ..
        } = self.state
        else {
            return;
        };
        match new_index {
            Some(index) => {
                self.state = OverlayState::Open {
                    index,
                    was_scrolling,
                    loading,
                };
            }
            None => {
                self.close(autoscroll);
            }
        }
    }
}

impl Default for OverlayController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AutoscrollState, ScrollSpeedTier};

    #[test]
    fn test_open_pauses_and_close_resumes_autoscroll() {
        let mut scroll = AutoscrollController::new(ScrollSpeedTier::Medium);
        let mut overlay = OverlayController::new();
        scroll.start();

        overlay.open(4, &mut scroll);
        assert_eq!(scroll.state(), AutoscrollState::Idle);
        assert_eq!(
            overlay.state(),
            OverlayState::Open {
                index: 4,
                was_scrolling: true,
                loading: true
            }
        );

        assert!(overlay.close(&mut scroll));
        assert_eq!(overlay.state(), OverlayState::Closed);
        assert_eq!(scroll.state(), AutoscrollState::Scrolling(ScrollSpeedTier::Medium));
    }

    #[test]
    fn test_close_leaves_idle_autoscroll_idle() {
        let mut scroll = AutoscrollController::default();
        let mut overlay = OverlayController::new();

        overlay.open(0, &mut scroll);
        overlay.close(&mut scroll);
        assert!(!scroll.is_scrolling());
        assert!(!overlay.close(&mut scroll));
    }

    #[test]
    fn test_navigation_stops_at_last_item() {
        // Sequence [A, B, C, D, E], open C, Right twice lands on E and stays.
        let mut scroll = AutoscrollController::default();
        let mut overlay = OverlayController::new();
        overlay.open(2, &mut scroll);

        assert!(overlay.navigate(NavDirection::Next, 5));
        assert_eq!(overlay.current_index(), Some(3));
        assert!(overlay.navigate(NavDirection::Next, 5));
        assert_eq!(overlay.current_index(), Some(4));
        assert!(!overlay.navigate(NavDirection::Next, 5));
        assert_eq!(overlay.current_index(), Some(4));
    }

    #[test]
    fn test_navigation_stops_at_first_item() {
        let mut scroll = AutoscrollController::default();
        let mut overlay = OverlayController::new();
        overlay.open(0, &mut scroll);
        assert!(!overlay.navigate(NavDirection::Previous, 5));
        assert_eq!(overlay.current_index(), Some(0));
    }

    #[test]
    fn test_navigate_while_closed_is_noop() {
        let mut overlay = OverlayController::new();
        assert!(!overlay.navigate(NavDirection::Next, 5));
        assert_eq!(overlay.state(), OverlayState::Closed);
    }

    #[test]
    fn test_controls_hidden_until_loaded() {
        let mut scroll = AutoscrollController::default();
        let mut overlay = OverlayController::new();
        let generation = overlay.open(1, &mut scroll);
        assert!(overlay.is_loading());
        assert!(!overlay.controls_visible());

        assert!(overlay.media_loaded(generation));
        assert!(overlay.controls_visible());
        assert!(!overlay.media_loaded(generation));
    }

    #[test]
    fn test_stale_load_is_ignored() {
        let mut scroll = AutoscrollController::default();
        let mut overlay = OverlayController::new();
        let first = overlay.open(1, &mut scroll);
        overlay.navigate(NavDirection::Next, 5);

        assert!(!overlay.media_loaded(first));
        assert!(overlay.is_loading());
        assert!(overlay.media_loaded(overlay.generation()));
    }

    #[test]
    fn test_reopen_keeps_resume_flag() {
        let mut scroll = AutoscrollController::default();
        let mut overlay = OverlayController::new();
        scroll.start();
        overlay.open(1, &mut scroll);
        overlay.open(3, &mut scroll);

        overlay.close(&mut scroll);
        assert!(scroll.is_scrolling());
    }

    #[test]
    fn test_remap_moves_or_closes() {
        let mut scroll = AutoscrollController::default();
        let mut overlay = OverlayController::new();
        scroll.start();
        overlay.open(2, &mut scroll);

        overlay.remap(Some(7), &mut scroll);
        assert_eq!(overlay.current_index(), Some(7));
        assert!(!scroll.is_scrolling());

        overlay.remap(None, &mut scroll);
        assert!(!overlay.is_open());
        assert!(scroll.is_scrolling());
    }
}
