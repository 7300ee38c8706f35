// Menu bar with the autoscroll control and the folder selection drawer
// Only one drawer is expanded at a time; the window decides which via Gallery

use gtk4::prelude::*;
use gtk4::{Align, Box as GtkBox, Button, CheckButton, EventControllerMotion, Label, Orientation};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::state::{ActiveMenu, Gallery, ScrollSpeedTier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEvent {
    ToggleAutoscroll,
    SelectTier(ScrollSpeedTier),
    SpeedHover(bool),
    ToggleFolderMenu,
    ToggleFolder(String),
    SetAllFolders(bool),
}

type MenuEventCallback = Box<dyn Fn(MenuEvent)>;

pub struct MenuBar {
    root: GtkBox,
    scroll_button: Button,
    speed_box: GtkBox,
    speed_buttons: Vec<(ScrollSpeedTier, Button)>,
    folder_button: Button,
    folder_drawer: GtkBox,
    folder_list: GtkBox,
    folder_checks: RefCell<Vec<(String, CheckButton)>>,
    // Set while widgets are updated from state so their signals are ignored
    syncing: Rc<Cell<bool>>,
    on_event: Rc<RefCell<Option<MenuEventCallback>>>,
}

impl MenuBar {
    pub fn new() -> Self {
        let on_event: Rc<RefCell<Option<MenuEventCallback>>> = Rc::new(RefCell::new(None));
        let syncing = Rc::new(Cell::new(false));

        let root = GtkBox::new(Orientation::Horizontal, 8);
        root.add_css_class("menu-bar");
        root.set_margin_start(8);
        root.set_margin_end(8);
        root.set_margin_top(4);
        root.set_margin_bottom(4);

        // Autoscroll control
        let scroll_menu = GtkBox::new(Orientation::Horizontal, 4);
        scroll_menu.add_css_class("scroll-menu");

        let scroll_button = Button::from_icon_name("go-down-symbolic");
        scroll_button.set_tooltip_text(Some("Autoscroll (Space)"));
        scroll_button.add_css_class("scroll-btn");
        Self::emit_on_click(&scroll_button, &on_event, MenuEvent::ToggleAutoscroll);
        scroll_menu.append(&scroll_button);

        let speed_box = GtkBox::new(Orientation::Horizontal, 2);
        speed_box.add_css_class("scroll-speed");
        let speed_buttons: Vec<(ScrollSpeedTier, Button)> = ScrollSpeedTier::ALL
            .iter()
            .map(|&tier| {
                let button = Button::with_label(tier.short_name());
                Self::emit_on_click(&button, &on_event, MenuEvent::SelectTier(tier));
                speed_box.append(&button);
                (tier, button)
            })
            .collect();

        speed_box.set_visible(false);
        scroll_menu.append(&speed_box);

        let hover = EventControllerMotion::new();
        let on_event_enter = on_event.clone();
        hover.connect_enter(move |_, _x, _y| {
            if let Some(ref callback) = *on_event_enter.borrow() {
                callback(MenuEvent::SpeedHover(true));
            }
        });
        let on_event_leave = on_event.clone();
        hover.connect_leave(move |_| {
            if let Some(ref callback) = *on_event_leave.borrow() {
                callback(MenuEvent::SpeedHover(false));
            }
        });
        scroll_menu.add_controller(hover);
        root.append(&scroll_menu);

        // Folder selection
        let folder_menu = GtkBox::new(Orientation::Horizontal, 4);
        folder_menu.add_css_class("folder-menu");

        let folder_button = Button::with_label("Select");
        folder_button.set_tooltip_text(Some("Choose folders"));
        Self::emit_on_click(&folder_button, &on_event, MenuEvent::ToggleFolderMenu);
        folder_menu.append(&folder_button);

        let drawer = GtkBox::new(Orientation::Horizontal, 8);
        drawer.add_css_class("folder-drawer");

        let folder_list = GtkBox::new(Orientation::Horizontal, 6);
        drawer.append(&folder_list);

        let all_button = Button::with_label("All");
        Self::emit_on_click(&all_button, &on_event, MenuEvent::SetAllFolders(true));
        let none_button = Button::with_label("None");
        Self::emit_on_click(&none_button, &on_event, MenuEvent::SetAllFolders(false));
        drawer.append(&all_button);
        drawer.append(&none_button);

        drawer.set_visible(false);
        folder_menu.append(&drawer);
        root.append(&folder_menu);

        let spacer = Label::new(None);
        spacer.set_hexpand(true);
        root.append(&spacer);

        Self {
            root,
            scroll_button,
            speed_box,
            speed_buttons,
            folder_button,
            folder_drawer: drawer,
            folder_list,
            folder_checks: RefCell::new(Vec::new()),
            syncing,
            on_event,
        }
    }

    fn emit_on_click(
        button: &Button,
        on_event: &Rc<RefCell<Option<MenuEventCallback>>>,
        event: MenuEvent,
    ) {
        let on_event = on_event.clone();
        button.connect_clicked(move |_| {
            if let Some(ref callback) = *on_event.borrow() {
                callback(event.clone());
            }
        });
    }

    pub fn widget(&self) -> &GtkBox {
        &self.root
    }

    /// Replaces the folder check buttons.
    pub fn set_folders<'a>(&self, folders: impl Iterator<Item = &'a str>) {
        let mut checks = self.folder_checks.borrow_mut();
        for (_, check) in checks.drain(..) {
            self.folder_list.remove(&check);
        }

        for folder in folders {
            let check = CheckButton::with_label(folder);
            check.set_halign(Align::Start);

            let on_event = self.on_event.clone();
            let syncing = self.syncing.clone();
            let name = folder.to_owned();
            check.connect_toggled(move |_| {
                if syncing.get() {
                    return;
                }
                if let Some(ref callback) = *on_event.borrow() {
                    callback(MenuEvent::ToggleFolder(name.clone()));
                }
            });

            self.folder_list.append(&check);
            checks.push((folder.to_owned(), check));
        }
    }

    /// Brings every control in line with the gallery state.
    pub fn sync(&self, gallery: &Gallery) {
        self.syncing.set(true);

        let autoscroll = gallery.autoscroll();
        self.scroll_button.set_icon_name(if autoscroll.is_scrolling() {
            "window-close-symbolic"
        } else {
            "go-down-symbolic"
        });
        self.speed_box.set_visible(gallery.speed_menu_visible());

        for (tier, button) in &self.speed_buttons {
            if *tier == autoscroll.tier() {
                button.add_css_class("active");
            } else {
                button.remove_css_class("active");
            }
        }

        let folders_open = gallery.active_menu() == ActiveMenu::FolderSelect;
        self.folder_drawer.set_visible(folders_open);
        if folders_open {
            self.folder_button.add_css_class("active");
        } else {
            self.folder_button.remove_css_class("active");
        }

        for (name, check) in self.folder_checks.borrow().iter() {
            check.set_active(gallery.filter().is_enabled(name));
        }

        self.syncing.set(false);
    }

    pub fn connect_event<F>(&self, callback: F)
    where
        F: Fn(MenuEvent) + 'static,
    {
        *self.on_event.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for MenuBar {
    fn default() -> Self {
        Self::new()
    }
}
