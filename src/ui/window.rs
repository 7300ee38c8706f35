use gtk4::gdk::Display;
use gtk4::prelude::*;
use gtk4::{
    glib, Application, ApplicationWindow, Box as GtkBox, CssProvider, Orientation, Overlay,
    Settings, STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::{Rc, Weak};
use std::sync::mpsc;
use std::time::Duration;
use tokio::runtime::Builder as TokioRuntimeBuilder;

use super::keybindings::{GridAction, Keybindings, OverlayAction, ViewMode};
use super::masonry_view::MasonryView;
use super::media_tile;
use super::menu_bar::{MenuBar, MenuEvent};
use super::overlay_view::OverlayView;
use crate::config::GalleryConfig;
use crate::layout::LazyLoadController;
use crate::models::{MediaLibrary, ScanConfig, SettingsStore};
use crate::state::{ActiveMenu, Gallery, NavDirection, ScrollSpeedTier, SpeedStep, TickParams};

const FALLBACK_CSS: &str = r#"
window {
    background-color: #0a0a0a;
    color: #e0e0e0;
}

button {
    background-color: transparent;
    border: 1px solid #333333;
    color: #e0e0e0;
}

button:hover {
    background-color: rgba(224, 224, 224, 0.05);
    border-color: #555555;
}

button.active {
    border-color: #00ff88;
    color: #00ff88;
}

.menu-bar {
    background-color: #121212;
}

.masonry {
    padding: 6px;
}

.media-tile {
    background-color: #121212;
}

.media-tile-failed {
    border: 1px dashed #333333;
}

.media-overlay {
    background-color: rgba(0, 0, 0, 0.92);
}

.overlay-btn {
    background-color: rgba(0, 0, 0, 0.6);
    margin: 8px;
}

.overlay-caption,
.grid-status {
    color: #888888;
}
"#;

fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(FALLBACK_CSS);

    if let Some(display) = Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

const RESIZE_DEBOUNCE: Duration = Duration::from_millis(80);

/// Owns the glib timeout that drives autoscroll. Dropping it removes the
/// source, so at most one tick is ever scheduled.
struct ScrollTicker {
    params: TickParams,
    source: Option<glib::SourceId>,
}

impl ScrollTicker {
    fn start(params: TickParams, window: Weak<MainWindow>) -> Self {
        let source = glib::timeout_add_local(params.interval, move || {
            if let Some(window) = window.upgrade() {
                window.masonry.scroll_by(params.pixels);
            }
            glib::ControlFlow::Continue
        });
        Self {
            params,
            source: Some(source),
        }
    }
}

impl Drop for ScrollTicker {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            source.remove();
        }
    }
}

pub struct MainWindow {
    self_weak: RefCell<Weak<MainWindow>>,
    window: ApplicationWindow,
    gallery: Rc<RefCell<Gallery>>,
    masonry: MasonryView,
    menu_bar: MenuBar,
    overlay_view: Rc<OverlayView>,
    keybindings: Keybindings,
    ticker: RefCell<Option<ScrollTicker>>,
    settings: Option<SettingsStore>,
    config: GalleryConfig,
    last_layout_width: Cell<i32>,
    resize_pending: Cell<bool>,
    scan_generation: Cell<u64>,
}

impl MainWindow {
    pub fn new(app: &Application, initial_path: Option<&Path>) -> Rc<Self> {
        load_css();
        if let Some(settings) = Settings::default() {
            settings.set_gtk_application_prefer_dark_theme(true);
        }

        let config = GalleryConfig::from_env();
        media_tile::set_tile_size(config.tile_size);

        let settings = match SettingsStore::open_default() {
            Ok(store) => Some(store),
            Err(err) => {
                tracing::warn!(error = ?err, "Settings unavailable, speed will not persist");
                None
            }
        };
        let tier = settings
            .as_ref()
            .and_then(|store| match store.speed_tier() {
                Ok(tier) => tier,
                Err(err) => {
                    tracing::warn!(error = ?err, "Failed to read scroll speed");
                    None
                }
            })
            .unwrap_or_default();

        let gallery = Rc::new(RefCell::new(Gallery::new(
            MediaLibrary::default(),
            LazyLoadController::new(config.page_size, config.load_threshold_px),
            tier,
        )));

        let window = ApplicationWindow::builder()
            .application(app)
            .title("mosaic")
            .default_width(1280)
            .default_height(800)
            .build();

        let masonry = MasonryView::new();
        let menu_bar = MenuBar::new();
        let overlay_view = OverlayView::new();
        overlay_view.set_key_target(&window);

        let main_box = GtkBox::new(Orientation::Vertical, 0);
        main_box.append(menu_bar.widget());
        main_box.append(masonry.widget());

        let root = Overlay::new();
        root.set_child(Some(&main_box));
        root.add_overlay(overlay_view.widget());
        window.set_child(Some(&root));

        let keybindings = Keybindings::new();
        keybindings.attach(&window);

        let main_window = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            window,
            gallery,
            masonry,
            menu_bar,
            overlay_view,
            keybindings,
            ticker: RefCell::new(None),
            settings,
            config,
            last_layout_width: Cell::new(0),
            resize_pending: Cell::new(false),
            scan_generation: Cell::new(0),
        });
        *main_window.self_weak.borrow_mut() = Rc::downgrade(&main_window);

        main_window.setup_keybindings();
        main_window.setup_menu_bar();
        main_window.setup_grid();
        main_window.setup_overlay();
        main_window.setup_layout_resize_observer();

        main_window.menu_bar.sync(&main_window.gallery.borrow());

        match main_window.config.resolve_media_root(initial_path.map(Path::to_path_buf)) {
            Some(root) => main_window.load_library(&root),
            None => main_window
                .masonry
                .set_status(Some("No media directory found. Set MOSAIC_MEDIA_DIR.")),
        }

        main_window
    }

    fn setup_keybindings(&self) {
        let gallery = self.gallery.clone();
        self.keybindings
            .set_scrolling_lookup(move || gallery.borrow().autoscroll().is_scrolling());

        let weak_self = self.self_weak.borrow().clone();
        self.keybindings.connect_grid_action(move |action| {
            if let Some(window) = weak_self.upgrade() {
                window.handle_grid_action(action);
            }
        });
    }

    fn setup_menu_bar(&self) {
        let weak_self = self.self_weak.borrow().clone();
        self.menu_bar.connect_event(move |event| {
            if let Some(window) = weak_self.upgrade() {
                window.handle_menu_event(event);
            }
        });
    }

    fn setup_grid(&self) {
        let weak_self = self.self_weak.borrow().clone();
        self.masonry.connect_item_activated(move |index| {
            if let Some(window) = weak_self.upgrade() {
                window.open_overlay(index);
            }
        });

        let weak_self = self.self_weak.borrow().clone();
        self.masonry.connect_scroll_proximity(move |distance| {
            if let Some(window) = weak_self.upgrade() {
                window.on_scroll_proximity(distance);
            }
        });
    }

    fn setup_overlay(&self) {
        let weak_self = self.self_weak.borrow().clone();
        self.overlay_view.connect_close(move || {
            if let Some(window) = weak_self.upgrade() {
                window.close_overlay();
            }
        });

        let weak_self = self.self_weak.borrow().clone();
        self.overlay_view.connect_key_action(move |action| {
            if let Some(window) = weak_self.upgrade() {
                match action {
                    OverlayAction::Previous => window.navigate_overlay(NavDirection::Previous),
                    OverlayAction::Next => window.navigate_overlay(NavDirection::Next),
                    OverlayAction::Close => window.close_overlay(),
                }
            }
        });

        let weak_self = self.self_weak.borrow().clone();
        self.overlay_view.connect_loaded(move |generation| {
            if let Some(window) = weak_self.upgrade() {
                let loaded = window.gallery.borrow_mut().overlay_media_loaded(generation);
                if loaded {
                    window.overlay_view.set_loading(false);
                }
            }
        });
    }

    /// Re-resolves the breakpoint once the grid's width has settled.
    fn setup_layout_resize_observer(&self) {
        let weak_self = self.self_weak.borrow().clone();
        self.masonry
            .widget()
            .add_tick_callback(move |_widget, _clock| {
                if let Some(window) = weak_self.upgrade() {
                    let width = window.masonry.content_width().round() as i32;
                    if width > 0 && width != window.last_layout_width.get() {
                        window.last_layout_width.set(width);
                        window.schedule_breakpoint_debounced(RESIZE_DEBOUNCE);
                    }
                }
                glib::ControlFlow::Continue
            });
    }

    fn schedule_breakpoint_debounced(&self, delay: Duration) {
        if self.resize_pending.replace(true) {
            return;
        }
        let weak_self = self.self_weak.borrow().clone();
        glib::timeout_add_local(delay, move || {
            if let Some(window) = weak_self.upgrade() {
                window.resize_pending.set(false);
                window.apply_width(window.last_layout_width.get());
            }
            glib::ControlFlow::Break
        });
    }

    fn apply_width(&self, width: i32) {
        let changed = match self.gallery.try_borrow_mut() {
            Ok(mut gallery) => gallery.resize(width as f32),
            Err(_) => false,
        };
        if changed {
            tracing::debug!(
                "Grid width {} -> {} columns",
                width,
                self.gallery.borrow().column_count()
            );
            self.render_grid(false);
        }
    }

    fn handle_grid_action(&self, action: GridAction) {
        match action {
            GridAction::ToggleAutoscroll => {
                self.gallery.borrow_mut().toggle_autoscroll();
            }
            GridAction::StopAutoscroll => {
                self.gallery.borrow_mut().stop_autoscroll();
            }
            GridAction::SpeedUp => self.step_speed(SpeedStep::Faster),
            GridAction::SlowDown => self.step_speed(SpeedStep::Slower),
            GridAction::ToggleFullscreen => self.toggle_fullscreen(),
        }
        self.refresh_autoscroll();
    }

    fn handle_menu_event(&self, event: MenuEvent) {
        match event {
            MenuEvent::ToggleAutoscroll => {
                self.gallery.borrow_mut().toggle_autoscroll();
            }
            MenuEvent::SelectTier(tier) => {
                let changed = self.gallery.borrow_mut().set_speed_tier(tier);
                if changed {
                    self.persist_tier(tier);
                }
            }
            MenuEvent::SpeedHover(true) => self.gallery.borrow_mut().speed_pointer_entered(),
            MenuEvent::SpeedHover(false) => self.gallery.borrow_mut().speed_pointer_left(),
            MenuEvent::ToggleFolderMenu => {
                self.gallery
                    .borrow_mut()
                    .toggle_menu(ActiveMenu::FolderSelect);
            }
            MenuEvent::ToggleFolder(folder) => {
                let changed = self.gallery.borrow_mut().toggle_folder(&folder);
                if changed {
                    self.on_sequence_changed();
                }
            }
            MenuEvent::SetAllFolders(enabled) => {
                let changed = self.gallery.borrow_mut().set_all_folders(enabled);
                if changed {
                    self.on_sequence_changed();
                }
            }
        }
        self.refresh_autoscroll();
    }

    fn step_speed(&self, step: SpeedStep) {
        let (changed, tier) = {
            let mut gallery = self.gallery.borrow_mut();
            (gallery.step_speed(step), gallery.autoscroll().tier())
        };
        if changed {
            self.persist_tier(tier);
        }
    }

    fn persist_tier(&self, tier: ScrollSpeedTier) {
        if let Some(store) = self.settings.as_ref() {
            if let Err(err) = store.set_speed_tier(tier) {
                tracing::warn!(error = ?err, "Failed to persist scroll speed");
            }
        }
    }

    /// Brings the scroll timer and the menu bar in line with the gallery.
    fn refresh_autoscroll(&self) {
        let desired = self.gallery.borrow().autoscroll().tick();
        {
            let mut ticker = self.ticker.borrow_mut();
            if ticker.as_ref().map(|t| t.params) != desired {
                // Old source goes before the new one is added.
                *ticker = None;
                if let Some(params) = desired {
                    let weak_self = self.self_weak.borrow().clone();
                    *ticker = Some(ScrollTicker::start(params, weak_self));
                }
            }
        }
        self.menu_bar.sync(&self.gallery.borrow());
    }

    fn on_scroll_proximity(&self, distance: f64) {
        let grew = match self.gallery.try_borrow_mut() {
            Ok(mut gallery) => gallery.on_scroll(distance),
            Err(_) => false,
        };
        if grew {
            self.render_grid(false);
        }
    }

    fn render_grid(&self, rebuild: bool) {
        let gallery = self.gallery.borrow();
        self.masonry
            .render(gallery.column_layout(), gallery.sequence(), rebuild);
    }

    /// The media sequence was rebuilt by a folder change.
    fn on_sequence_changed(&self) {
        self.render_grid(true);
        self.masonry.scroll_to_top();

        let overlay_open = self.gallery.borrow().overlay().is_open();
        if !overlay_open && self.overlay_view.is_visible() {
            self.hide_overlay_view();
        }

        let none_selected = self.gallery.borrow().filter().enabled_count() == 0;
        self.masonry
            .set_status(none_selected.then_some("No folders selected"));
    }

    fn open_overlay(&self, index: usize) {
        let opened = {
            let mut gallery = self.gallery.borrow_mut();
            gallery
                .open_overlay(index)
                .and_then(|generation| gallery.item(index).cloned().map(|item| (generation, item)))
        };
        let Some((generation, item)) = opened else {
            return;
        };
        tracing::debug!("Opening overlay at {} ({:?})", index, item.path);

        self.masonry.set_interactive(false);
        self.keybindings.set_view_mode(ViewMode::Overlay);
        self.overlay_view.show(&item, generation);
        self.refresh_autoscroll();
    }

    fn navigate_overlay(&self, direction: NavDirection) {
        let target = {
            let mut gallery = self.gallery.borrow_mut();
            if !gallery.navigate_overlay(direction) {
                return;
            }
            let generation = gallery.overlay().generation();
            gallery.overlay_item().cloned().map(|item| (generation, item))
        };
        if let Some((generation, item)) = target {
            self.overlay_view.show(&item, generation);
        }
    }

    fn close_overlay(&self) {
        let closed = self.gallery.borrow_mut().close_overlay();
        if closed {
            self.hide_overlay_view();
            self.refresh_autoscroll();
        }
    }

    fn hide_overlay_view(&self) {
        self.overlay_view.hide();
        self.masonry.set_interactive(true);
        self.keybindings.set_view_mode(ViewMode::Grid);
    }

    fn toggle_fullscreen(&self) {
        if self.window.is_fullscreen() {
            self.window.unfullscreen();
        } else {
            self.window.fullscreen();
        }
    }

    /// Scans `root` on a background thread and swaps the result in.
    pub fn load_library(&self, root: &Path) {
        self.masonry
            .set_status(Some(&format!("Scanning {}", root.display())));
        let generation = self.scan_generation.get().wrapping_add(1);
        self.scan_generation.set(generation);

        let root_buf = root.to_path_buf();
        let (tx, rx) = mpsc::channel::<(u64, anyhow::Result<MediaLibrary>)>();
        std::thread::spawn(move || {
            let result = (|| -> anyhow::Result<MediaLibrary> {
                let runtime = TokioRuntimeBuilder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(MediaLibrary::scan_async(root_buf, ScanConfig::default()))
            })();
            let _ = tx.send((generation, result));
        });

        let requested_root = root.to_path_buf();
        let weak_self = self.self_weak.borrow().clone();
        glib::timeout_add_local(Duration::from_millis(16), move || match rx.try_recv() {
            Ok((result_generation, result)) => {
                if let Some(window) = weak_self.upgrade() {
                    window.apply_library(&requested_root, result_generation, result);
                }
                glib::ControlFlow::Break
            }
            Err(mpsc::TryRecvError::Empty) => glib::ControlFlow::Continue,
            Err(mpsc::TryRecvError::Disconnected) => glib::ControlFlow::Break,
        });
    }

    fn apply_library(
        &self,
        root: &Path,
        result_generation: u64,
        result: anyhow::Result<MediaLibrary>,
    ) {
        if result_generation != self.scan_generation.get() {
            return;
        }

        let (library, failed) = match result {
            Ok(library) => (library, false),
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to scan {:?}", root);
                (MediaLibrary::default(), true)
            }
        };

        if self.overlay_view.is_visible() {
            self.hide_overlay_view();
        }
        self.gallery.borrow_mut().set_library(library);
        {
            let gallery = self.gallery.borrow();
            self.menu_bar.set_folders(gallery.filter().known());
            let status = if failed {
                Some(format!("Could not read {}", root.display()))
            } else {
                gallery
                    .is_empty()
                    .then(|| format!("No media found in {}", root.display()))
            };
            self.masonry.set_status(status.as_deref());
        }
        self.render_grid(true);
        self.masonry.scroll_to_top();
        self.refresh_autoscroll();
        let title = match self.gallery.borrow().library().root() {
            Some(scanned) => format!("mosaic - {}", scanned.display()),
            None => "mosaic".to_owned(),
        };
        self.window.set_title(Some(&title));
    }

    pub fn present(&self) {
        self.window.present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_css_styles_overlay() {
        assert!(FALLBACK_CSS.contains(".media-overlay"));
        assert!(FALLBACK_CSS.contains("button.active"));
    }
}
