//! Timer-driven autoscroll state machine.
//!
//! The controller only decides *what* should happen: whether a periodic tick
//! is wanted and at which rate. The window owns the actual glib timeout and
//! reconciles it against [`AutoscrollController::tick`] after every change.

use std::time::Duration;

/// Selectable autoscroll speeds, slowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScrollSpeedTier {
    VerySlow,
    Slow,
    Medium,
    Fast,
    VeryFast,
}

impl ScrollSpeedTier {
    pub const ALL: [ScrollSpeedTier; 5] = [
        Self::VerySlow,
        Self::Slow,
        Self::Medium,
        Self::Fast,
        Self::VeryFast,
    ];

    pub fn pixels_per_tick(self) -> f64 {
        match self {
            Self::VerySlow => 1.0,
            Self::Slow => 2.0,
            Self::Medium => 6.0,
            Self::Fast => 12.0,
            Self::VeryFast => 36.0,
        }
    }

    pub fn millis_per_tick(self) -> u64 {
        match self {
            Self::VerySlow | Self::Slow | Self::Medium => 30,
            Self::Fast => 36,
            Self::VeryFast => 40,
        }
    }

    /// Label shown on the speed menu and the persisted representation.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::VerySlow => "vs",
            Self::Slow => "s",
            Self::Medium => "m",
            Self::Fast => "f",
            Self::VeryFast => "vf",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|tier| tier.short_name() == name.trim())
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// One step faster, or `None` at the fastest tier.
    pub fn faster(self) -> Option<Self> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// One step slower, or `None` at the slowest tier.
    pub fn slower(self) -> Option<Self> {
        self.position()
            .checked_sub(1)
            .and_then(|i| Self::ALL.get(i).copied())
    }
}

impl Default for ScrollSpeedTier {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoscrollState {
    Idle,
    Scrolling(ScrollSpeedTier),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedStep {
    Faster,
    Slower,
}

/// What the periodic scroll timer should look like right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickParams {
    pub pixels: f64,
    pub interval: Duration,
}

impl From<ScrollSpeedTier> for TickParams {
    fn from(tier: ScrollSpeedTier) -> Self {
        Self {
            pixels: tier.pixels_per_tick(),
            interval: Duration::from_millis(tier.millis_per_tick()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutoscrollController {
    scrolling: bool,
    tier: ScrollSpeedTier,
    speed_menu_visible: bool,
}

impl AutoscrollController {
    pub fn new(tier: ScrollSpeedTier) -> Self {
        Self {
            scrolling: false,
            tier,
            speed_menu_visible: false,
        }
    }

    pub fn state(&self) -> AutoscrollState {
        if self.scrolling {
            AutoscrollState::Scrolling(self.tier)
        } else {
            AutoscrollState::Idle
        }
    }

    pub fn is_scrolling(&self) -> bool {
        self.scrolling
    }

    pub fn tier(&self) -> ScrollSpeedTier {
        self.tier
    }

    pub fn speed_menu_visible(&self) -> bool {
        self.speed_menu_visible
    }

    /// Idle -> Scrolling. Opens the speed menu automatically.
    pub fn start(&mut self) -> bool {
        if self.scrolling {
            return false;
        }
        self.scrolling = true;
        self.speed_menu_visible = true;
        true
    }

    /// Scrolling -> Idle. Hides the speed menu.
    pub fn stop(&mut self) -> bool {
        if !self.scrolling {
            return false;
        }
        self.scrolling = false;
        self.speed_menu_visible = false;
        true
    }

    pub fn toggle(&mut self) {
        if self.scrolling {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Select a tier. Returns true if the tier changed (and so must be
    /// persisted, and a running tick restarted).
    pub fn set_tier(&mut self, tier: ScrollSpeedTier) -> bool {
        if self.tier == tier {
            return false;
        }
        self.tier = tier;
        true
    }

    /// Step the tier while scrolling. No wraparound and a no-op while idle.
    pub fn step(&mut self, step: SpeedStep) -> bool {
        if !self.scrolling {
            return false;
        }
        let next = match step {
            SpeedStep::Faster => self.tier.faster(),
            SpeedStep::Slower => self.tier.slower(),
        };
        match next {
            Some(tier) => self.set_tier(tier),
            None => false,
        }
    }

    pub fn pointer_entered(&mut self) {
        self.speed_menu_visible = true;
    }

    pub fn pointer_left(&mut self) {
        self.speed_menu_visible = false;
    }

    /// The periodic tick the view must be running, if any.
    pub fn tick(&self) -> Option<TickParams> {
        self.scrolling.then(|| self.tier.into())
    }
}

impl Default for AutoscrollController {
    fn default() -> Self {
        Self::new(ScrollSpeedTier::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_table() {
        let rates: Vec<(f64, u64)> = ScrollSpeedTier::ALL
            .iter()
            .map(|t| (t.pixels_per_tick(), t.millis_per_tick()))
            .collect();
        assert_eq!(
            rates,
            vec![(1.0, 30), (2.0, 30), (6.0, 30), (12.0, 36), (36.0, 40)]
        );
    }

    #[test]
    fn test_short_names_parse_back() {
        for tier in ScrollSpeedTier::ALL {
            assert_eq!(ScrollSpeedTier::from_short_name(tier.short_name()), Some(tier));
        }
        assert_eq!(ScrollSpeedTier::from_short_name(" vf\n"), Some(ScrollSpeedTier::VeryFast));
        assert_eq!(ScrollSpeedTier::from_short_name("turbo"), None);
    }

    #[test]
    fn test_toggle_starts_and_stops_tick() {
        let mut scroll = AutoscrollController::default();
        assert_eq!(scroll.state(), AutoscrollState::Idle);
        assert!(scroll.tick().is_none());

        scroll.toggle();
        assert_eq!(scroll.state(), AutoscrollState::Scrolling(ScrollSpeedTier::Medium));
        let tick = scroll.tick().unwrap();
        assert_eq!(tick.pixels, 6.0);
        assert_eq!(tick.interval, Duration::from_millis(30));

        scroll.toggle();
        assert_eq!(scroll.state(), AutoscrollState::Idle);
        assert!(scroll.tick().is_none());
    }

    #[test]
    fn test_step_has_no_wraparound() {
        let mut scroll = AutoscrollController::new(ScrollSpeedTier::Fast);
        scroll.start();

        assert!(scroll.step(SpeedStep::Faster));
        assert_eq!(scroll.tier(), ScrollSpeedTier::VeryFast);
        assert!(!scroll.step(SpeedStep::Faster));
        assert_eq!(scroll.tier(), ScrollSpeedTier::VeryFast);

        scroll.set_tier(ScrollSpeedTier::VerySlow);
        assert!(!scroll.step(SpeedStep::Slower));
        assert_eq!(scroll.tier(), ScrollSpeedTier::VerySlow);
    }

    #[test]
    fn test_step_is_ignored_while_idle() {
        let mut scroll = AutoscrollController::default();
        assert!(!scroll.step(SpeedStep::Faster));
        assert_eq!(scroll.tier(), ScrollSpeedTier::Medium);
    }

    #[test]
    fn test_speed_change_while_scrolling_changes_tick_not_state() {
        let mut scroll = AutoscrollController::default();
        scroll.start();
        let before = scroll.tick();
        assert!(scroll.set_tier(ScrollSpeedTier::VeryFast));
        assert!(scroll.is_scrolling());
        assert_ne!(scroll.tick(), before);
        assert!(!scroll.set_tier(ScrollSpeedTier::VeryFast));
    }

    #[test]
    fn test_speed_menu_visibility() {
        let mut scroll = AutoscrollController::default();
        assert!(!scroll.speed_menu_visible());

        scroll.start();
        assert!(scroll.speed_menu_visible(), "menu opens when scrolling starts");

        scroll.pointer_left();
        assert!(!scroll.speed_menu_visible());
        scroll.pointer_entered();
        assert!(scroll.speed_menu_visible());

        scroll.stop();
        assert!(!scroll.speed_menu_visible(), "menu hides when scrolling stops");
    }
}
