pub mod autoscroll;
pub mod folder_filter;
pub mod gallery;
pub mod overlay;

pub use autoscroll::{AutoscrollController, AutoscrollState, ScrollSpeedTier, SpeedStep, TickParams};
pub use folder_filter::FolderFilter;
pub use gallery::{ActiveMenu, Gallery};
pub use overlay::{NavDirection, OverlayController, OverlayState};
