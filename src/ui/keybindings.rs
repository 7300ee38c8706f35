// Keybindings for the mosaic gallery
//
// Grid (overlay closed):
// - Space: Toggle autoscroll
// - Escape: Stop autoscroll
// - Up / k: Faster (only while scrolling)
// - Down / j: Slower (only while scrolling)
// - f: Toggle fullscreen
//
// Overlay (attached on open, detached on close):
// - Left / h: Previous item
// - Right / l: Next item
// - Escape / q: Close

use gdk4::Key;
use gtk4::prelude::*;
use gtk4::{EventControllerKey, PropagationPhase, Widget};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Which key map is live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Grid,
    Overlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridAction {
    ToggleAutoscroll,
    StopAutoscroll,
    SpeedUp,
    SlowDown,
    ToggleFullscreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    Previous,
    Next,
    Close,
}

/// Grid key map. Speed keys only bind while scrolling so the arrows keep
/// their normal meaning for the scrolled window otherwise.
pub fn grid_action(keyval: Key, scrolling: bool) -> Option<GridAction> {
    match keyval {
        Key::space => Some(GridAction::ToggleAutoscroll),
        Key::Escape => Some(GridAction::StopAutoscroll),
        Key::f | Key::F => Some(GridAction::ToggleFullscreen),
        Key::Up | Key::k if scrolling => Some(GridAction::SpeedUp),
        Key::Down | Key::j if scrolling => Some(GridAction::SlowDown),
        _ => None,
    }
}

pub fn overlay_action(keyval: Key) -> Option<OverlayAction> {
    match keyval {
        Key::Left | Key::h => Some(OverlayAction::Previous),
        Key::Right | Key::l => Some(OverlayAction::Next),
        Key::Escape | Key::q | Key::Q => Some(OverlayAction::Close),
        _ => None,
    }
}

/// Callback type for grid actions
pub type GridActionCallback = Box<dyn Fn(GridAction)>;

/// Window-wide grid key handling. Silent while the overlay owns the keyboard.
pub struct Keybindings {
    controller: EventControllerKey,
    view_mode: Rc<Cell<ViewMode>>,
    on_grid_action: Rc<RefCell<Option<GridActionCallback>>>,
    is_scrolling: Rc<RefCell<Option<Box<dyn Fn() -> bool>>>>,
}

impl Keybindings {
    pub fn new() -> Self {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);

        let view_mode = Rc::new(Cell::new(ViewMode::Grid));
        let on_grid_action: Rc<RefCell<Option<GridActionCallback>>> = Rc::new(RefCell::new(None));
        let is_scrolling: Rc<RefCell<Option<Box<dyn Fn() -> bool>>>> = Rc::new(RefCell::new(None));

        let view_mode_clone = view_mode.clone();
        let on_grid_action_clone = on_grid_action.clone();
        let is_scrolling_clone = is_scrolling.clone();

        controller.connect_key_pressed(move |_controller, keyval, _keycode, _state| {
            if view_mode_clone.get() != ViewMode::Grid {
                return glib::Propagation::Proceed;
            }
            let scrolling = is_scrolling_clone
                .borrow()
                .as_ref()
                .map(|lookup| lookup())
                .unwrap_or(false);

            let Some(action) = grid_action(keyval, scrolling) else {
                return glib::Propagation::Proceed;
            };
            if let Some(ref callback) = *on_grid_action_clone.borrow() {
                callback(action);
            }
            glib::Propagation::Stop
        });

        Self {
            controller,
            view_mode,
            on_grid_action,
            is_scrolling,
        }
    }

    /// Attach keybindings to a widget (typically the main window)
    pub fn attach(&self, widget: &impl IsA<Widget>) {
        widget.add_controller(self.controller.clone());
    }

    pub fn set_view_mode(&self, mode: ViewMode) {
        self.view_mode.set(mode);
    }

    /// Set the autoscroll state lookup used to gate the speed keys
    pub fn set_scrolling_lookup<F>(&self, f: F)
    where
        F: Fn() -> bool + 'static,
    {
        *self.is_scrolling.borrow_mut() = Some(Box::new(f));
    }

    pub fn connect_grid_action<F>(&self, callback: F)
    where
        F: Fn(GridAction) + 'static,
    {
        *self.on_grid_action.borrow_mut() = Some(Box::new(callback));
    }
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::new()
    }
}

/// Key controller for the overlay's lifetime. Added to the window when the
/// overlay opens and removed when it closes.
pub struct ScopedKeys {
    controller: EventControllerKey,
    attached_to: RefCell<Option<glib::WeakRef<Widget>>>,
}

impl ScopedKeys {
    pub fn new<F>(on_action: F) -> Self
    where
        F: Fn(OverlayAction) + 'static,
    {
        let controller = EventControllerKey::new();
        controller.set_propagation_phase(PropagationPhase::Capture);
        controller.connect_key_pressed(move |_controller, keyval, _keycode, _state| {
            match overlay_action(keyval) {
                Some(action) => {
                    on_action(action);
                    glib::Propagation::Stop
                }
                None => glib::Propagation::Proceed,
            }
        });

        Self {
            controller,
            attached_to: RefCell::new(None),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached_to.borrow().is_some()
    }

    pub fn attach(&self, widget: &impl IsA<Widget>) {
        if self.is_attached() {
            return;
        }
        widget.add_controller(self.controller.clone());
        *self.attached_to.borrow_mut() = Some(widget.upcast_ref::<Widget>().downgrade());
    }

    pub fn detach(&self) {
        if let Some(widget) = self.attached_to.borrow_mut().take().and_then(|w| w.upgrade()) {
            widget.remove_controller(&self.controller);
        }
    }
}

impl Drop for ScopedKeys {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_toggles_and_escape_stops() {
        assert_eq!(grid_action(Key::space, false), Some(GridAction::ToggleAutoscroll));
        assert_eq!(grid_action(Key::space, true), Some(GridAction::ToggleAutoscroll));
        assert_eq!(grid_action(Key::Escape, true), Some(GridAction::StopAutoscroll));
    }

    #[test]
    fn test_speed_keys_only_while_scrolling() {
        assert_eq!(grid_action(Key::Up, true), Some(GridAction::SpeedUp));
        assert_eq!(grid_action(Key::k, true), Some(GridAction::SpeedUp));
        assert_eq!(grid_action(Key::Down, true), Some(GridAction::SlowDown));
        assert_eq!(grid_action(Key::j, true), Some(GridAction::SlowDown));

        assert_eq!(grid_action(Key::Up, false), None);
        assert_eq!(grid_action(Key::j, false), None);
    }

    #[test]
    fn test_fullscreen_key() {
        assert_eq!(grid_action(Key::f, false), Some(GridAction::ToggleFullscreen));
        assert_eq!(grid_action(Key::x, false), None);
    }

    #[test]
    fn test_overlay_keys() {
        assert_eq!(overlay_action(Key::Left), Some(OverlayAction::Previous));
        assert_eq!(overlay_action(Key::h), Some(OverlayAction::Previous));
        assert_eq!(overlay_action(Key::Right), Some(OverlayAction::Next));
        assert_eq!(overlay_action(Key::l), Some(OverlayAction::Next));
        assert_eq!(overlay_action(Key::Escape), Some(OverlayAction::Close));
        assert_eq!(overlay_action(Key::q), Some(OverlayAction::Close));
        assert_eq!(overlay_action(Key::space), None);
    }
}
