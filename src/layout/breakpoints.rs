/// Named viewport-width tiers. Ordered by ascending minimum width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Breakpoint {
    Sm,
    Md,
    Lg,
    Xl,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 4] = [Self::Sm, Self::Md, Self::Lg, Self::Xl];

    /// Active breakpoint before any width has been observed.
    pub const INITIAL: Breakpoint = Self::Lg;

    pub fn min_width(self) -> f32 {
        match self {
            Self::Sm => 0.0,
            Self::Md => 600.0,
            Self::Lg => 1280.0,
            Self::Xl => 1920.0,
        }
    }

    pub fn column_count(self) -> usize {
        match self {
            Self::Sm => 1,
            Self::Md => 2,
            Self::Lg => 3,
            Self::Xl => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
            Self::Xl => "xl",
        }
    }

    /// Largest breakpoint whose minimum width is `<= width` (inclusive lower
    /// bound). Widths below every threshold, and NaN, resolve to the smallest.
    pub fn resolve(width: f32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|bp| width >= bp.min_width())
            .unwrap_or(Self::Sm)
    }
}

impl Default for Breakpoint {
    fn default() -> Self {
        Self::INITIAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_width_is_smallest() {
        assert_eq!(Breakpoint::resolve(0.0), Breakpoint::Sm);
        assert_eq!(Breakpoint::resolve(-20.0), Breakpoint::Sm);
        assert_eq!(Breakpoint::resolve(f32::NAN), Breakpoint::Sm);
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        assert_eq!(Breakpoint::resolve(599.0), Breakpoint::Sm);
        assert_eq!(Breakpoint::resolve(600.0), Breakpoint::Md);
        assert_eq!(Breakpoint::resolve(1279.9), Breakpoint::Md);
        assert_eq!(Breakpoint::resolve(1280.0), Breakpoint::Lg);
        assert_eq!(Breakpoint::resolve(1920.0), Breakpoint::Xl);
    }

    #[test]
    fn test_above_all_thresholds_is_largest() {
        assert_eq!(Breakpoint::resolve(10_000.0), Breakpoint::Xl);
        assert_eq!(Breakpoint::resolve(f32::INFINITY), Breakpoint::Xl);
    }

    #[test]
    fn test_column_counts_grow_with_width() {
        let counts: Vec<usize> = Breakpoint::ALL.iter().map(|b| b.column_count()).collect();
        assert_eq!(counts, vec![1, 2, 3, 4]);
        assert!(Breakpoint::ALL.iter().all(|b| b.column_count() >= 1));
    }
}
