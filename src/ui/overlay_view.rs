// Full-screen media overlay
// Backdrop clicks close it; clicks on the media frame are claimed by the frame itself

use gdk4::Texture;
use gtk4::prelude::*;
use gtk4::{
    gio, glib, Align, Box as GtkBox, Button, ContentFit, EventSequenceState, GestureClick, Label,
    MediaFile, MediaStream, Orientation, Overlay, Picture, Spinner, Stack, Video, Widget,
};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::animation::{self, AnimatedFrames, FramePlayer};
use super::keybindings::{OverlayAction, ScopedKeys};
use crate::image_loader::{self, DecodedFrame};
use crate::models::MediaItem;

/// Longest edge the overlay decodes images at.
const OVERLAY_MAX_EDGE: u32 = 2560;

struct DecodeRequest {
    generation: u64,
    path: PathBuf,
}

type OverlayCallback = Rc<dyn Fn()>;
type LoadedCallback = Rc<dyn Fn(u64)>;
type KeyActionCallback = Rc<dyn Fn(OverlayAction)>;

pub struct OverlayView {
    self_weak: RefCell<Weak<OverlayView>>,
    root: GtkBox,
    stack: Stack,
    picture: Picture,
    video: Video,
    video_stream: RefCell<Option<MediaFile>>,
    animation: RefCell<Option<FramePlayer>>,
    spinner: Spinner,
    close_button: Button,
    launch_button: Button,
    caption: Label,
    current_path: RefCell<Option<PathBuf>>,
    generation: Cell<u64>,
    generation_guard: Arc<AtomicU64>,
    decode_tx: flume::Sender<DecodeRequest>,
    keys: ScopedKeys,
    key_target: RefCell<Option<glib::WeakRef<Widget>>>,
    on_close: Rc<RefCell<Option<OverlayCallback>>>,
    on_loaded: RefCell<Option<LoadedCallback>>,
    on_key_action: Rc<RefCell<Option<KeyActionCallback>>>,
}

impl OverlayView {
    pub fn new() -> Rc<Self> {
        let root = GtkBox::new(Orientation::Vertical, 0);
        root.add_css_class("media-overlay");
        root.set_hexpand(true);
        root.set_vexpand(true);
        root.set_visible(false);

        let picture = Picture::new();
        picture.set_can_shrink(true);
        picture.set_content_fit(ContentFit::Contain);
        picture.add_css_class("overlay-media");

        let video = Video::new();
        video.set_autoplay(true);
        video.set_loop(true);
        video.add_css_class("overlay-media");

        let stack = Stack::new();
        stack.set_hhomogeneous(false);
        stack.set_vhomogeneous(false);
        stack.add_named(&picture, Some("image"));
        stack.add_named(&video, Some("video"));

        let spinner = Spinner::new();
        spinner.set_size_request(48, 48);
        spinner.set_halign(Align::Center);
        spinner.set_valign(Align::Center);

        let close_button = Button::from_icon_name("window-close-symbolic");
        close_button.set_tooltip_text(Some("Close (Esc)"));
        close_button.set_halign(Align::End);
        close_button.set_valign(Align::Start);
        close_button.add_css_class("overlay-btn");

        let launch_button = Button::from_icon_name("document-open-symbolic");
        launch_button.set_tooltip_text(Some("Open with default application"));
        launch_button.set_halign(Align::Start);
        launch_button.set_valign(Align::Start);
        launch_button.add_css_class("overlay-btn");

        let frame = Overlay::new();
        frame.add_css_class("overlay-frame");
        frame.set_halign(Align::Center);
        frame.set_valign(Align::Center);
        frame.set_hexpand(true);
        frame.set_vexpand(true);
        frame.set_margin_start(48);
        frame.set_margin_end(48);
        frame.set_margin_top(48);
        frame.set_margin_bottom(24);
        frame.set_child(Some(&stack));
        frame.add_overlay(&spinner);
        frame.add_overlay(&close_button);
        frame.add_overlay(&launch_button);

        // The frame swallows its own clicks so only the backdrop closes.
        let frame_click = GestureClick::new();
        frame_click.connect_pressed(|gesture, _n, _x, _y| {
            gesture.set_state(EventSequenceState::Claimed);
        });
        frame.add_controller(frame_click);

        let caption = Label::new(None);
        caption.add_css_class("overlay-caption");
        caption.set_ellipsize(gtk4::pango::EllipsizeMode::Middle);
        caption.set_margin_bottom(12);

        root.append(&frame);
        root.append(&caption);

        let on_close: Rc<RefCell<Option<OverlayCallback>>> = Rc::new(RefCell::new(None));
        let on_key_action: Rc<RefCell<Option<KeyActionCallback>>> = Rc::new(RefCell::new(None));

        let backdrop_click = GestureClick::new();
        backdrop_click.set_button(1);
        let on_close_backdrop = on_close.clone();
        backdrop_click.connect_released(move |_, _n, _x, _y| {
            let callback = on_close_backdrop.borrow().clone();
            if let Some(callback) = callback {
                callback();
            }
        });
        root.add_controller(backdrop_click);

        let on_close_button = on_close.clone();
        close_button.connect_clicked(move |_| {
            let callback = on_close_button.borrow().clone();
            if let Some(callback) = callback {
                callback();
            }
        });

        let on_key_action_scoped = on_key_action.clone();
        let keys = ScopedKeys::new(move |action| {
            let callback = on_key_action_scoped.borrow().clone();
            if let Some(callback) = callback {
                callback(action);
            }
        });

        let generation_guard = Arc::new(AtomicU64::new(0));
        let (decode_tx, decode_rx) = flume::unbounded::<DecodeRequest>();
        let (load_tx, load_rx) = async_channel::unbounded::<(u64, Option<Vec<DecodedFrame>>)>();

        // Single decode worker, latest request wins.
        let worker_guard = generation_guard.clone();
        std::thread::spawn(move || {
            while let Ok(mut req) = decode_rx.recv() {
                while let Ok(next) = decode_rx.try_recv() {
                    req = next;
                }
                if req.generation != worker_guard.load(Ordering::Acquire) {
                    continue;
                }
                let decoded = match image_loader::decode_frames(&req.path, OVERLAY_MAX_EDGE) {
                    Ok(frames) => Some(frames),
                    Err(err) => {
                        warn!(error = ?err, "Overlay decode failed");
                        None
                    }
                };
                if load_tx.send_blocking((req.generation, decoded)).is_err() {
                    break;
                }
            }
        });

        let view = Rc::new(Self {
            self_weak: RefCell::new(Weak::new()),
            root,
            stack,
            picture,
            video,
            video_stream: RefCell::new(None),
            animation: RefCell::new(None),
            spinner,
            close_button,
            launch_button,
            caption,
            current_path: RefCell::new(None),
            generation: Cell::new(0),
            generation_guard,
            decode_tx,
            keys,
            key_target: RefCell::new(None),
            on_close,
            on_loaded: RefCell::new(None),
            on_key_action,
        });
        *view.self_weak.borrow_mut() = Rc::downgrade(&view);

        let view_weak = Rc::downgrade(&view);
        glib::spawn_future_local(async move {
            while let Ok((generation, decoded)) = load_rx.recv().await {
                if let Some(view) = view_weak.upgrade() {
                    view.handle_decoded(generation, decoded);
                } else {
                    break;
                }
            }
        });

        let view_weak = Rc::downgrade(&view);
        view.launch_button.connect_clicked(move |_| {
            if let Some(view) = view_weak.upgrade() {
                view.open_externally();
            }
        });

        view
    }

    pub fn widget(&self) -> &GtkBox {
        &self.root
    }

    /// Widget that receives the overlay key controller while open.
    pub fn set_key_target(&self, widget: &impl IsA<Widget>) {
        *self.key_target.borrow_mut() = Some(widget.upcast_ref::<Widget>().downgrade());
    }

    /// Shows `item` for load generation `generation`.
    pub fn show(&self, item: &MediaItem, generation: u64) {
        self.generation.set(generation);
        self.generation_guard.store(generation, Ordering::Release);
        *self.current_path.borrow_mut() = Some(item.path.clone());
        self.caption.set_text(&item.file_name());
        self.set_loading(true);

        if !self.root.is_visible() {
            self.root.set_visible(true);
            if let Some(target) = self.key_target.borrow().as_ref().and_then(|w| w.upgrade()) {
                self.keys.attach(&target);
            }
        }

        if item.is_video() {
            self.show_video(&item.path, generation);
        } else {
            self.show_image(&item.path, generation);
        }
    }

    fn show_image(&self, path: &Path, generation: u64) {
        self.clear_video();
        self.animation.borrow_mut().take();
        self.picture.set_paintable(Option::<&Texture>::None);
        self.stack.set_visible_child_name("image");

        if image_loader::is_raster(path) {
            let _ = self.decode_tx.send(DecodeRequest {
                generation,
                path: path.to_path_buf(),
            });
            return;
        }

        // GTK renders vector images itself.
        self.picture.set_filename(Some(path));
        let view_weak = self.self_weak.borrow().clone();
        glib::idle_add_local_once(move || {
            if let Some(view) = view_weak.upgrade() {
                view.emit_loaded(generation);
            }
        });
    }

    fn show_video(&self, path: &Path, generation: u64) {
        self.clear_video();
        self.animation.borrow_mut().take();
        self.picture.set_paintable(Option::<&Texture>::None);
        self.stack.set_visible_child_name("video");

        let media = MediaFile::for_filename(path);
        media.set_muted(true);
        media.set_loop(true);

        let view_weak = self.self_weak.borrow().clone();
        animation::connect_first_frame(&media, move || {
            if let Some(view) = view_weak.upgrade() {
                view.emit_loaded(generation);
            }
        });
        let view_weak = self.self_weak.borrow().clone();
        media.connect_error_notify(move |media| {
            if let Some(err) = media.error() {
                warn!("Overlay video failed: {}", err);
                if let Some(view) = view_weak.upgrade() {
                    view.emit_loaded(generation);
                }
            }
        });

        self.video.set_media_stream(Some(&media));
        media.play();
        *self.video_stream.borrow_mut() = Some(media);
    }

    fn handle_decoded(&self, generation: u64, decoded: Option<Vec<DecodedFrame>>) {
        if generation != self.generation.get() || !self.root.is_visible() {
            debug!("Dropping stale overlay decode {}", generation);
            return;
        }
        match decoded.and_then(AnimatedFrames::from_decoded) {
            Some(frames) => {
                *self.animation.borrow_mut() = FramePlayer::start(&self.picture, frames);
            }
            None => self.picture.set_paintable(Option::<&Texture>::None),
        }
        self.emit_loaded(generation);
    }

    fn emit_loaded(&self, generation: u64) {
        if generation != self.generation.get() {
            return;
        }
        let callback = self.on_loaded.borrow().clone();
        if let Some(callback) = callback {
            callback(generation);
        }
    }

    /// Spinner while loading; close and launch controls only once loaded.
    pub fn set_loading(&self, loading: bool) {
        self.spinner.set_visible(loading);
        self.spinner.set_spinning(loading);
        self.stack.set_opacity(if loading { 0.0 } else { 1.0 });
        self.close_button.set_visible(!loading);
        self.launch_button.set_visible(!loading);
    }

    pub fn hide(&self) {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        self.generation_guard.store(generation, Ordering::Release);

        self.keys.detach();
        self.clear_video();
        self.animation.borrow_mut().take();
        self.picture.set_paintable(Option::<&Texture>::None);
        *self.current_path.borrow_mut() = None;
        self.set_loading(false);
        self.root.set_visible(false);
    }

    fn clear_video(&self) {
        if let Some(media) = self.video_stream.borrow_mut().take() {
            media.pause();
        }
        self.video.set_media_stream(Option::<&MediaStream>::None);
    }

    pub fn is_visible(&self) -> bool {
        self.root.is_visible()
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.current_path.borrow().clone()
    }

    /// Hands the item to the desktop's default handler. The overlay stays.
    fn open_externally(&self) {
        let Some(path) = self.current_path() else {
            return;
        };
        let uri = gio::File::for_path(&path).uri();
        if let Err(err) =
            gio::AppInfo::launch_default_for_uri(&uri, Option::<&gio::AppLaunchContext>::None)
        {
            warn!("Failed to open {:?} externally: {}", path, err);
        }
    }

    pub fn connect_close<F: Fn() + 'static>(&self, callback: F) {
        *self.on_close.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn connect_loaded<F: Fn(u64) + 'static>(&self, callback: F) {
        *self.on_loaded.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn connect_key_action<F: Fn(OverlayAction) + 'static>(&self, callback: F) {
        *self.on_key_action.borrow_mut() = Some(Rc::new(callback));
    }
}
