// Masonry grid: K vertical column boxes inside a ScrolledWindow
// Tiles are appended in place while the layout only grows; any other change rebuilds

use gtk4::prelude::*;
use gtk4::{glib, Align, Box as GtkBox, Label, Orientation, PolicyType, ScrolledWindow};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::media_tile::MediaTile;
use crate::layout::ColumnLayout;
use crate::models::MediaItem;

const COLUMN_SPACING: i32 = 6;

type ItemActivatedCallback = Box<dyn Fn(usize)>;

pub struct MasonryView {
    scrolled_window: ScrolledWindow,
    columns_box: GtkBox,
    status_label: Label,
    columns: RefCell<Vec<GtkBox>>,
    rendered: RefCell<Option<Arc<ColumnLayout>>>,
    on_item_activated: Rc<RefCell<Option<ItemActivatedCallback>>>,
    adjustment_handlers: RefCell<Vec<glib::SignalHandlerId>>,
}

impl MasonryView {
    pub fn new() -> Self {
        let columns_box = GtkBox::new(Orientation::Horizontal, COLUMN_SPACING);
        columns_box.set_homogeneous(true);
        columns_box.set_hexpand(true);
        columns_box.set_valign(Align::Start);
        columns_box.add_css_class("masonry");

        let status_label = Label::new(None);
        status_label.add_css_class("grid-status");
        status_label.set_margin_top(48);
        status_label.set_visible(false);

        let content = GtkBox::new(Orientation::Vertical, 0);
        content.append(&status_label);
        content.append(&columns_box);

        let scrolled_window = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .kinetic_scrolling(true)
            .propagate_natural_width(false)
            .propagate_natural_height(false)
            .child(&content)
            .build();
        scrolled_window.set_hexpand(true);
        scrolled_window.set_vexpand(true);
        scrolled_window.set_min_content_width(0);
        scrolled_window.set_min_content_height(0);

        Self {
            scrolled_window,
            columns_box,
            status_label,
            columns: RefCell::new(Vec::new()),
            rendered: RefCell::new(None),
            on_item_activated: Rc::new(RefCell::new(None)),
            adjustment_handlers: RefCell::new(Vec::new()),
        }
    }

    /// Get the scrolled window widget to add to the window
    pub fn widget(&self) -> &ScrolledWindow {
        &self.scrolled_window
    }

    /// Width available to the columns. GTK4 scrollbars overlay the
    /// content, so this is the full viewport width.
    pub fn content_width(&self) -> f32 {
        self.scrolled_window.width().max(0) as f32
    }

    /// Shows `layout` over `items`. With `rebuild` false and a layout that
    /// only appends to the one on screen, existing tiles are kept.
    pub fn render(&self, layout: Arc<ColumnLayout>, items: &[MediaItem], rebuild: bool) {
        let previous = self.rendered.borrow().clone();
        match previous {
            Some(ref previous) if !rebuild && Arc::ptr_eq(previous, &layout) => return,
            Some(ref previous) if !rebuild && layout.extends(previous) => {
                self.append_tiles(&layout, previous, items);
            }
            _ => self.rebuild(&layout, items),
        }
        *self.rendered.borrow_mut() = Some(layout);
    }

    fn rebuild(&self, layout: &ColumnLayout, items: &[MediaItem]) {
        let mut columns = self.columns.borrow_mut();
        for column in columns.drain(..) {
            self.columns_box.remove(&column);
        }

        for indices in layout.columns() {
            let column = GtkBox::new(Orientation::Vertical, COLUMN_SPACING);
            column.set_valign(Align::Start);
            column.add_css_class("masonry-column");
            for &index in indices {
                if let Some(item) = items.get(index) {
                    column.append(&self.create_tile(index, item));
                }
            }
            self.columns_box.append(&column);
            columns.push(column);
        }
        tracing::debug!(
            "Rebuilt grid: {} columns, {} tiles",
            layout.column_count(),
            layout.item_count()
        );
    }

    fn append_tiles(&self, layout: &ColumnLayout, previous: &ColumnLayout, items: &[MediaItem]) {
        let columns = self.columns.borrow();
        for ((column, indices), old) in columns
            .iter()
            .zip(layout.columns())
            .zip(previous.columns())
        {
            for &index in &indices[old.len()..] {
                if let Some(item) = items.get(index) {
                    column.append(&self.create_tile(index, item));
                }
            }
        }
    }

    fn create_tile(&self, index: usize, item: &MediaItem) -> MediaTile {
        let tile = MediaTile::new(index, item);
        let on_item_activated = self.on_item_activated.clone();
        tile.connect_activated(move |index| {
            if let Some(ref callback) = *on_item_activated.borrow() {
                callback(index);
            }
        });
        tile
    }

    pub fn set_status(&self, status: Option<&str>) {
        match status {
            Some(text) => {
                self.status_label.set_text(text);
                self.status_label.set_visible(true);
            }
            None => self.status_label.set_visible(false),
        }
    }

    /// Content bottom minus viewport bottom, in pixels.
    pub fn distance_to_bottom(&self) -> f64 {
        let vadj = self.scrolled_window.vadjustment();
        (vadj.upper() - (vadj.value() + vadj.page_size())).max(0.0)
    }

    /// Advances the scroll position, clamped to the scrollable range.
    pub fn scroll_by(&self, pixels: f64) {
        let vadj = self.scrolled_window.vadjustment();
        let max = (vadj.upper() - vadj.page_size()).max(vadj.lower());
        let target = (vadj.value() + pixels).clamp(vadj.lower(), max);
        if target != vadj.value() {
            vadj.set_value(target);
        }
    }

    pub fn scroll_to_top(&self) {
        let vadj = self.scrolled_window.vadjustment();
        vadj.set_value(vadj.lower());
    }

    /// While the overlay is open the grid takes no pointer input.
    pub fn set_interactive(&self, interactive: bool) {
        self.scrolled_window.set_can_target(interactive);
    }

    /// Calls `callback` with the distance to the bottom whenever the scroll
    /// position or the content size changes. Disconnected on drop.
    pub fn connect_scroll_proximity<F>(&self, callback: F)
    where
        F: Fn(f64) + 'static,
    {
        let callback = Rc::new(callback);
        let vadj = self.scrolled_window.vadjustment();
        let mut handlers = self.adjustment_handlers.borrow_mut();

        let on_value = callback.clone();
        handlers.push(vadj.connect_value_changed(move |adj| {
            on_value((adj.upper() - (adj.value() + adj.page_size())).max(0.0));
        }));

        // Fires on upper/page-size changes, so a short page keeps growing.
        let on_changed = callback;
        handlers.push(vadj.connect_changed(move |adj| {
            on_changed((adj.upper() - (adj.value() + adj.page_size())).max(0.0));
        }));
    }

    pub fn connect_item_activated<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.on_item_activated.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for MasonryView {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MasonryView {
    fn drop(&mut self) {
        let vadj = self.scrolled_window.vadjustment();
        for handler in self.adjustment_handlers.borrow_mut().drain(..) {
            vadj.disconnect(handler);
        }
    }
}
