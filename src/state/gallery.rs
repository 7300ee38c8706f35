//! Single owner of all mutable gallery state.
//!
//! Views hold an `Rc<RefCell<Gallery>>` and go through these methods; every
//! method returns whether something the view renders has changed so the
//! caller knows what to refresh.

use std::sync::Arc;

use tracing::{debug, info};

use crate::layout::{Breakpoint, ColumnLayout, LazyLoadController, LayoutCache};
use crate::models::{MediaItem, MediaLibrary};
use crate::state::folder_filter::new_shuffle_seed;
use crate::state::{
    AutoscrollController, FolderFilter, NavDirection, OverlayController, ScrollSpeedTier,
    SpeedStep,
};

/// Menu drawer currently expanded in the menu bar. At most one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveMenu {
    #[default]
    None,
    Scroll,
    FolderSelect,
}

pub struct Gallery {
    library: MediaLibrary,
    filter: FolderFilter,
    sequence: Vec<MediaItem>,
    breakpoint: Breakpoint,
    lazy: LazyLoadController,
    autoscroll: AutoscrollController,
    overlay: OverlayController,
    active_menu: ActiveMenu,
    layout_cache: LayoutCache,
}

impl Gallery {
    pub fn new(library: MediaLibrary, lazy: LazyLoadController, tier: ScrollSpeedTier) -> Self {
        Self::with_seed(library, lazy, tier, new_shuffle_seed())
    }

    pub fn with_seed(
        library: MediaLibrary,
        lazy: LazyLoadController,
        tier: ScrollSpeedTier,
        seed: u64,
    ) -> Self {
        let filter = FolderFilter::from_library(&library);
        let sequence = filter.sequence(&library, seed);
        Self {
            library,
            filter,
            sequence,
            breakpoint: Breakpoint::INITIAL,
            lazy,
            autoscroll: AutoscrollController::new(tier),
            overlay: OverlayController::new(),
            active_menu: ActiveMenu::None,
            layout_cache: LayoutCache::new(),
        }
    }

    /// Swaps in a freshly scanned library. All of its folders start enabled.
    pub fn set_library(&mut self, library: MediaLibrary) {
        self.overlay.close(&mut self.autoscroll);
        self.close_menus();
        self.layout_cache.clear();
        self.filter = FolderFilter::from_library(&library);
        self.library = library;
        self.rebuild_sequence(new_shuffle_seed());
        info!(
            "Gallery loaded {} items from {} folders",
            self.sequence.len(),
            self.library.folder_count()
        );
    }

    pub fn library(&self) -> &MediaLibrary {
        &self.library
    }

    pub fn filter(&self) -> &FolderFilter {
        &self.filter
    }

    pub fn sequence(&self) -> &[MediaItem] {
        &self.sequence
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&MediaItem> {
        self.sequence.get(index)
    }

    // Layout

    pub fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    pub fn column_count(&self) -> usize {
        self.breakpoint.column_count()
    }

    /// Re-resolves the breakpoint for a new grid width. Returns true if the
    /// column count changed.
    pub fn resize(&mut self, width: f32) -> bool {
        let next = Breakpoint::resolve(width);
        if next == self.breakpoint {
            return false;
        }
        debug!(
            "Breakpoint {} -> {} at width {}",
            self.breakpoint.name(),
            next.name(),
            width
        );
        self.breakpoint = next;
        true
    }

    pub fn visible_count(&self) -> usize {
        self.lazy.visible_count()
    }

    /// Scroll proximity check. Returns true when more tiles were revealed.
    pub fn on_scroll(&mut self, distance_to_bottom_px: f64) -> bool {
        self.lazy.on_scroll(distance_to_bottom_px, self.sequence.len())
    }

    pub fn column_layout(&self) -> Arc<ColumnLayout> {
        self.layout_cache.get_or_compute(
            self.sequence.len(),
            self.column_count(),
            Some(self.lazy.visible_count()),
        )
    }

    // Autoscroll

    pub fn autoscroll(&self) -> &AutoscrollController {
        &self.autoscroll
    }

    pub fn toggle_autoscroll(&mut self) {
        if self.autoscroll.is_scrolling() {
            self.stop_autoscroll();
        } else if self.autoscroll.start() {
            self.claim_scroll_menu();
        }
    }

    pub fn stop_autoscroll(&mut self) -> bool {
        if !self.autoscroll.stop() {
            return false;
        }
        self.claim_scroll_menu();
        true
    }

    pub fn step_speed(&mut self, step: SpeedStep) -> bool {
        self.autoscroll.step(step)
    }

    pub fn set_speed_tier(&mut self, tier: ScrollSpeedTier) -> bool {
        self.autoscroll.set_tier(tier)
    }

    pub fn speed_pointer_entered(&mut self) {
        self.autoscroll.pointer_entered();
        self.claim_scroll_menu();
    }

    pub fn speed_pointer_left(&mut self) {
        self.autoscroll.pointer_left();
        self.claim_scroll_menu();
    }

    /// The tier selector shows while scrolling or hovered. Other drawers do
    /// not affect it.
    pub fn speed_menu_visible(&self) -> bool {
        self.autoscroll.is_scrolling() || self.autoscroll.speed_menu_visible()
    }

    /// Marks the scroll menu active while its selector shows, but never
    /// takes over a drawer that is already open.
    fn claim_scroll_menu(&mut self) {
        let visible = self.speed_menu_visible();
        match self.active_menu {
            ActiveMenu::None if visible => self.active_menu = ActiveMenu::Scroll,
            ActiveMenu::Scroll if !visible => self.active_menu = ActiveMenu::None,
            _ => {}
        }
    }

    // Menus

    pub fn active_menu(&self) -> ActiveMenu {
        self.active_menu
    }

    pub fn toggle_menu(&mut self, menu: ActiveMenu) {
        self.active_menu = if self.active_menu == menu {
            ActiveMenu::None
        } else {
            menu
        };
    }

    pub fn close_menus(&mut self) {
        self.active_menu = ActiveMenu::None;
    }

    // Overlay

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    pub fn overlay_item(&self) -> Option<&MediaItem> {
        self.overlay.current_index().and_then(|i| self.sequence.get(i))
    }

    /// Opens the overlay on a sequence index. Returns the load generation,
    /// or `None` for an index outside the sequence.
    pub fn open_overlay(&mut self, index: usize) -> Option<u64> {
        if index >= self.sequence.len() {
            return None;
        }
        let generation = self.overlay.open(index, &mut self.autoscroll);
        self.claim_scroll_menu();
        Some(generation)
    }

    pub fn close_overlay(&mut self) -> bool {
        let closed = self.overlay.close(&mut self.autoscroll);
        if closed {
            self.claim_scroll_menu();
        }
        closed
    }

    pub fn navigate_overlay(&mut self, direction: NavDirection) -> bool {
        self.overlay.navigate(direction, self.sequence.len())
    }

    pub fn overlay_media_loaded(&mut self, generation: u64) -> bool {
        self.overlay.media_loaded(generation)
    }

    // Folders

    /// Flips a folder and rebuilds the sequence with a fresh shuffle.
    pub fn toggle_folder(&mut self, folder: &str) -> bool {
        if !self.filter.toggle(folder) {
            return false;
        }
        debug!(
            "Folder {:?} {}",
            folder,
            if self.filter.is_enabled(folder) {
                "enabled"
            } else {
                "disabled"
            }
        );
        self.rebuild_sequence(new_shuffle_seed());
        true
    }

    pub fn set_all_folders(&mut self, enabled: bool) -> bool {
        if !self.filter.set_all(enabled) {
            return false;
        }
        self.rebuild_sequence(new_shuffle_seed());
        true
    }

    fn rebuild_sequence(&mut self, seed: u64) {
        let open_path = self.overlay_item().map(|item| item.path.clone());

        self.sequence = self.filter.sequence(&self.library, seed);
        self.lazy.reset();

        if let Some(path) = open_path {
            let new_index = self.sequence.iter().position(|item| item.path == path);
            if new_index.is_none() {
                debug!("Open item {:?} filtered out, closing overlay", path);
            }
            self.overlay.remap(new_index, &mut self.autoscroll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;
    use crate::state::{AutoscrollState, OverlayState};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn item(folder: &str, name: &str) -> MediaItem {
        MediaItem::new(PathBuf::from(format!("/media/{folder}/{name}")), folder).unwrap()
    }

    fn library(per_folder: usize) -> MediaLibrary {
        let mut folders = BTreeMap::new();
        for folder in ["folder1", "folder2"] {
            let items = (0..per_folder)
                .map(|i| item(folder, &format!("{i}.png")))
                .collect();
            folders.insert(folder.to_string(), items);
        }
        MediaLibrary::from_folders(folders)
    }

    fn gallery(per_folder: usize) -> Gallery {
        Gallery::with_seed(
            library(per_folder),
            LazyLoadController::new(10, 500.0),
            ScrollSpeedTier::Medium,
            5,
        )
    }

    #[test]
    fn test_initial_layout_is_one_page_in_three_columns() {
        let gallery = gallery(20);
        assert_eq!(gallery.breakpoint(), Breakpoint::Lg);
        let layout = gallery.column_layout();
        assert_eq!(layout.column_count(), 3);
        assert_eq!(layout.item_count(), 10);
    }

    #[test]
    fn test_resize_changes_columns() {
        let mut gallery = gallery(3);
        assert!(gallery.resize(700.0));
        assert_eq!(gallery.column_count(), 2);
        assert!(!gallery.resize(900.0));
        assert!(gallery.resize(2000.0));
        assert_eq!(gallery.column_layout().column_count(), 4);
    }

    #[test]
    fn test_default_window_width_keeps_three_columns() {
        let mut gallery = gallery(20);
        assert!(gallery.resize(700.0));
        assert!(gallery.resize(1280.0));
        assert_eq!(gallery.breakpoint(), Breakpoint::Lg);
        assert_eq!(gallery.column_layout().column_count(), 3);
        assert!(gallery.resize(1279.0));
        assert_eq!(gallery.column_count(), 2);
    }

    #[test]
    fn test_scroll_near_bottom_reveals_next_page() {
        let mut gallery = gallery(20);
        assert!(gallery.on_scroll(100.0));
        assert_eq!(gallery.column_layout().item_count(), 20);
        assert!(!gallery.on_scroll(900.0));
    }

    #[test]
    fn test_overlay_close_resumes_medium_tier() {
        let mut gallery = gallery(3);
        gallery.toggle_autoscroll();
        assert_eq!(
            gallery.autoscroll().state(),
            AutoscrollState::Scrolling(ScrollSpeedTier::Medium)
        );

        gallery.open_overlay(1).unwrap();
        assert_eq!(gallery.autoscroll().state(), AutoscrollState::Idle);

        assert!(gallery.close_overlay());
        assert_eq!(
            gallery.autoscroll().state(),
            AutoscrollState::Scrolling(ScrollSpeedTier::Medium)
        );
    }

    #[test]
    fn test_open_overlay_out_of_range() {
        let mut gallery = gallery(1);
        assert!(gallery.open_overlay(2).is_none());
        assert!(!gallery.overlay().is_open());
    }

    #[test]
    fn test_navigation_follows_sequence() {
        let mut gallery = gallery(3);
        gallery.open_overlay(4).unwrap();
        let expected = gallery.item(5).cloned();
        assert!(gallery.navigate_overlay(NavDirection::Next));
        assert_eq!(gallery.overlay_item().cloned(), expected);
        assert!(!gallery.navigate_overlay(NavDirection::Next));
    }

    #[test]
    fn test_toggle_folder_resets_lazy_count() {
        let mut gallery = gallery(20);
        gallery.on_scroll(0.0);
        assert_eq!(gallery.visible_count(), 20);

        assert!(gallery.toggle_folder("folder1"));
        assert_eq!(gallery.visible_count(), 10);
        assert_eq!(gallery.len(), 20);
        assert!(gallery.sequence().iter().all(|i| i.folder == "folder2"));
        assert!(!gallery.toggle_folder("missing"));
    }

    #[test]
    fn test_filtering_out_open_item_closes_overlay() {
        let mut gallery = gallery(3);
        gallery.toggle_autoscroll();
        let index = gallery
            .sequence()
            .iter()
            .position(|i| i.folder == "folder1")
            .unwrap();
        gallery.open_overlay(index).unwrap();

        gallery.toggle_folder("folder1");
        assert_eq!(gallery.overlay().state(), OverlayState::Closed);
        assert!(gallery.autoscroll().is_scrolling());
    }

    #[test]
    fn test_surviving_open_item_is_remapped() {
        let mut gallery = gallery(3);
        let index = gallery
            .sequence()
            .iter()
            .position(|i| i.folder == "folder2")
            .unwrap();
        let path = gallery.item(index).unwrap().path.clone();
        gallery.open_overlay(index).unwrap();

        gallery.toggle_folder("folder1");
        assert!(gallery.overlay().is_open());
        assert_eq!(gallery.overlay_item().map(|i| &i.path), Some(&path));
    }

    #[test]
    fn test_scroll_menu_claims_only_a_free_slot() {
        let mut gallery = gallery(1);
        gallery.toggle_autoscroll();
        assert_eq!(gallery.active_menu(), ActiveMenu::Scroll);
        assert!(gallery.speed_menu_visible());

        gallery.toggle_menu(ActiveMenu::FolderSelect);
        assert_eq!(gallery.active_menu(), ActiveMenu::FolderSelect);
        assert!(gallery.speed_menu_visible());

        gallery.toggle_menu(ActiveMenu::FolderSelect);
        assert_eq!(gallery.active_menu(), ActiveMenu::None);

        gallery.stop_autoscroll();
        assert!(!gallery.speed_menu_visible());
        assert_eq!(gallery.active_menu(), ActiveMenu::None);
    }

    #[test]
    fn test_folder_drawer_survives_hover_and_autoscroll() {
        let mut gallery = gallery(2);
        gallery.toggle_menu(ActiveMenu::FolderSelect);

        gallery.speed_pointer_entered();
        assert!(gallery.speed_menu_visible());
        gallery.speed_pointer_left();
        assert_eq!(gallery.active_menu(), ActiveMenu::FolderSelect);

        gallery.toggle_autoscroll();
        assert_eq!(gallery.active_menu(), ActiveMenu::FolderSelect);
        gallery.open_overlay(0).unwrap();
        gallery.close_overlay();
        assert!(gallery.autoscroll().is_scrolling());
        assert_eq!(gallery.active_menu(), ActiveMenu::FolderSelect);

        gallery.stop_autoscroll();
        assert_eq!(gallery.active_menu(), ActiveMenu::FolderSelect);
    }

    #[test]
    fn test_set_library_replaces_sequence() {
        let mut gallery = Gallery::with_seed(
            MediaLibrary::default(),
            LazyLoadController::default(),
            ScrollSpeedTier::Slow,
            0,
        );
        assert!(gallery.is_empty());

        gallery.set_library(library(2));
        assert_eq!(gallery.len(), 4);
        assert!(gallery.sequence().iter().all(|i| i.kind == MediaKind::Image));
        assert_eq!(gallery.filter().enabled_count(), 2);
    }
}
