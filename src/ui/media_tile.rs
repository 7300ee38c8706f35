// Grid tile for a single media item
// Shows a spinner until the image is decoded or the video draws its first frame

use gdk4::Texture;
use glib::Object;
use gtk4::prelude::*;
use gtk4::subclass::prelude::*;
use gtk4::{gdk, glib, Align, Box as GtkBox, ContentFit, GestureClick, MediaFile, Orientation, Overlay, Picture, Spinner};
use once_cell::sync::OnceCell;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DEFAULT_TILE_SIZE;
use super::animation::{self, AnimatedFrames, FramePlayer};
use crate::image_loader::{self, DecodedFrame, DecodedImage};
use crate::models::{MediaItem, MediaKind};

const TILE_LOADER_THREADS: usize = 2;
const TILE_LOADER_QUEUE: usize = 512;
const TILE_CACHE_ENTRIES: usize = 512;
/// Height reserved for a tile before its media has a size.
const LOADING_HEIGHT_PX: i32 = 160;

static TILE_EDGE: OnceCell<u32> = OnceCell::new();

/// Sets the decode size used by every tile. Only the first call counts.
pub fn set_tile_size(edge: u32) {
    if TILE_EDGE.set(edge).is_err() {
        debug!("Tile size already set, ignoring {}", edge);
    }
}

fn tile_size() -> u32 {
    *TILE_EDGE.get_or_init(|| DEFAULT_TILE_SIZE)
}

#[derive(Debug)]
struct DecodeRequest {
    path: PathBuf,
    max_edge: u32,
}

#[derive(Debug)]
struct DecodeResult {
    path: PathBuf,
    frames: Option<Vec<DecodedFrame>>,
}

#[derive(Clone)]
struct TileWaiter {
    tile: glib::WeakRef<MediaTile>,
    token: u64,
}

struct TileLoaderState {
    pending_paths: HashSet<PathBuf>,
    waiters: HashMap<PathBuf, Vec<TileWaiter>>,
    // Stills only; animations are decoded per tile.
    cache: lru::LruCache<PathBuf, Rc<AnimatedFrames>>,
}

/// Decodes tile images on a small worker pool and hands frames back to the
/// tiles that asked for them. Still textures are kept in an LRU cache so a
/// relayout does not decode again.
struct TileLoader {
    request_tx: flume::Sender<DecodeRequest>,
    result_rx: flume::Receiver<DecodeResult>,
    state: RefCell<TileLoaderState>,
}

static NEXT_LOAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static TILE_LOADER: Rc<TileLoader> = TileLoader::new();
}

impl TileLoader {
    fn new() -> Rc<Self> {
        let (request_tx, request_rx) = flume::bounded::<DecodeRequest>(TILE_LOADER_QUEUE);
        let (result_tx, result_rx) = flume::unbounded::<DecodeResult>();

        for _ in 0..TILE_LOADER_THREADS {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            std::thread::spawn(move || {
                while let Ok(req) = rx.recv() {
                    let frames = match image_loader::decode_frames(&req.path, req.max_edge) {
                        Ok(frames) => Some(frames),
                        Err(err) => {
                            warn!(error = ?err, "Tile decode failed");
                            None
                        }
                    };
                    let _ = tx.send(DecodeResult {
                        path: req.path,
                        frames,
                    });
                }
            });
        }

        let cache_size = NonZeroUsize::new(TILE_CACHE_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        let loader = Rc::new(Self {
            request_tx,
            result_rx,
            state: RefCell::new(TileLoaderState {
                pending_paths: HashSet::new(),
                waiters: HashMap::new(),
                cache: lru::LruCache::new(cache_size),
            }),
        });

        let loader_weak = Rc::downgrade(&loader);
        glib::timeout_add_local(Duration::from_millis(16), move || {
            if let Some(loader) = loader_weak.upgrade() {
                loader.process_results();
                glib::ControlFlow::Continue
            } else {
                glib::ControlFlow::Break
            }
        });

        loader
    }

    fn request(&self, tile: &MediaTile, path: &Path, token: u64) {
        let mut state = self.state.borrow_mut();

        if let Some(frames) = state.cache.get(path).cloned() {
            let tile_weak = tile.downgrade();
            glib::idle_add_local_once(move || {
                if let Some(tile) = tile_weak.upgrade() {
                    tile.apply_frames(token, Some(frames));
                }
            });
            return;
        }

        state
            .waiters
            .entry(path.to_path_buf())
            .or_default()
            .push(TileWaiter {
                tile: tile.downgrade(),
                token,
            });

        if state.pending_paths.insert(path.to_path_buf()) {
            let request = DecodeRequest {
                path: path.to_path_buf(),
                max_edge: tile_size(),
            };
            if self.request_tx.try_send(request).is_err() {
                warn!("Tile decode queue full, dropping {:?}", path);
                state.pending_paths.remove(path);
                let waiters = state.waiters.remove(path).unwrap_or_default();
                drop(state);
                for waiter in waiters {
                    if let Some(tile) = waiter.tile.upgrade() {
                        tile.apply_frames(waiter.token, None);
                    }
                }
            }
        }
    }

    fn process_results(&self) {
        while let Ok(result) = self.result_rx.try_recv() {
            let frames = result.frames.and_then(AnimatedFrames::from_decoded);

            let waiters = {
                let mut state = self.state.borrow_mut();
                state.pending_paths.remove(&result.path);
                if let Some(ref frames) = frames {
                    if !frames.is_animated() {
                        state.cache.put(result.path.clone(), frames.clone());
                    }
                }
                state.waiters.remove(&result.path).unwrap_or_default()
            };

            for waiter in waiters {
                if let Some(tile) = waiter.tile.upgrade() {
                    tile.apply_frames(waiter.token, frames.clone());
                }
            }
        }
    }
}

pub(crate) fn create_texture_from_rgba(image: DecodedImage) -> Option<Texture> {
    let DecodedImage {
        rgba,
        width,
        height,
    } = image;
    if width == 0 || height == 0 {
        return None;
    }
    let expected = (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4);
    if rgba.len() < expected {
        return None;
    }
    let bytes = glib::Bytes::from_owned(rgba);
    let texture = gdk::MemoryTexture::new(
        width as i32,
        height as i32,
        gdk::MemoryFormat::R8g8b8a8,
        &bytes,
        (width * 4) as usize,
    );
    Some(texture.upcast())
}

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct MediaTileInner {
        pub picture: RefCell<Option<Picture>>,
        pub spinner: RefCell<Option<Spinner>>,
        pub media: RefCell<Option<MediaFile>>,
        pub animation: RefCell<Option<FramePlayer>>,
        pub path: RefCell<PathBuf>,
        pub index: Cell<usize>,
        pub load_token: Cell<u64>,
        pub on_activated: RefCell<Option<Rc<dyn Fn(usize)>>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for MediaTileInner {
        const NAME: &'static str = "MosaicMediaTile";
        type Type = super::MediaTile;
        type ParentType = GtkBox;
    }

    impl ObjectImpl for MediaTileInner {
        fn constructed(&self) {
            self.parent_constructed();

            let obj = self.obj();
            obj.set_orientation(Orientation::Vertical);
            obj.set_hexpand(true);
            obj.set_valign(Align::Start);
            obj.add_css_class("media-tile");
        }

        fn dispose(&self) {
            self.animation.borrow_mut().take();
            if let Some(media) = self.media.borrow_mut().take() {
                media.pause();
            }
        }
    }

    impl WidgetImpl for MediaTileInner {}
    impl BoxImpl for MediaTileInner {}
}

glib::wrapper! {
    pub struct MediaTile(ObjectSubclass<imp::MediaTileInner>)
        @extends GtkBox, gtk4::Widget,
        @implements gtk4::Accessible, gtk4::Buildable, gtk4::ConstraintTarget, gtk4::Orientable;
}

impl MediaTile {
    /// Builds a tile for the item at `index` of the media sequence and starts
    /// loading its media.
    pub fn new(index: usize, item: &MediaItem) -> Self {
        let tile: Self = Object::builder().build();
        tile.setup_widgets();
        tile.bind(index, item);
        tile
    }

    fn setup_widgets(&self) {
        let imp = self.imp();

        let picture = Picture::new();
        picture.set_can_shrink(true);
        picture.set_content_fit(ContentFit::Contain);
        picture.set_hexpand(true);
        picture.add_css_class("media-tile-picture");

        let spinner = Spinner::new();
        spinner.set_halign(Align::Center);
        spinner.set_valign(Align::Center);
        spinner.set_size_request(32, 32);

        let overlay = Overlay::new();
        overlay.set_child(Some(&picture));
        overlay.add_overlay(&spinner);
        self.append(&overlay);

        let tile_weak = self.downgrade();
        let click = GestureClick::new();
        click.set_button(1);
        click.connect_pressed(move |_, _n, _x, _y| {
            if let Some(tile) = tile_weak.upgrade() {
                tile.emit_activated();
            }
        });
        overlay.add_controller(click);

        *imp.picture.borrow_mut() = Some(picture);
        *imp.spinner.borrow_mut() = Some(spinner);
    }

    fn bind(&self, index: usize, item: &MediaItem) {
        let imp = self.imp();
        imp.index.set(index);
        *imp.path.borrow_mut() = item.path.clone();
        self.set_tooltip_text(Some(&item.file_name()));

        let token = NEXT_LOAD_TOKEN.fetch_add(1, Ordering::Relaxed);
        imp.load_token.set(token);
        self.set_loading(true);

        match item.kind {
            MediaKind::Video => self.load_video(&item.path),
            MediaKind::Image if image_loader::is_raster(&item.path) => {
                TILE_LOADER.with(|loader| loader.request(self, &item.path, token));
            }
            MediaKind::Image => {
                if let Some(picture) = imp.picture.borrow().as_ref() {
                    picture.set_filename(Some(&item.path));
                }
                self.set_loading(false);
            }
            MediaKind::Unknown => self.set_loading(false),
        }
    }

    /// Grid videos play muted and looped, like animated images.
    fn load_video(&self, path: &Path) {
        let imp = self.imp();
        let media = MediaFile::for_filename(path);
        media.set_muted(true);
        media.set_loop(true);

        let tile_weak = self.downgrade();
        animation::connect_first_frame(&media, move || {
            if let Some(tile) = tile_weak.upgrade() {
                tile.set_loading(false);
            }
        });
        let tile_weak = self.downgrade();
        media.connect_error_notify(move |media| {
            if let (Some(tile), Some(err)) = (tile_weak.upgrade(), media.error()) {
                warn!("Video tile failed for {:?}: {}", tile.path(), err);
                tile.set_loading(false);
            }
        });

        if let Some(picture) = imp.picture.borrow().as_ref() {
            picture.set_paintable(Some(&media));
        }
        media.play();
        *imp.media.borrow_mut() = Some(media);
    }

    fn apply_frames(&self, token: u64, frames: Option<Rc<AnimatedFrames>>) {
        let imp = self.imp();
        if imp.load_token.get() != token {
            return;
        }
        match (imp.picture.borrow().as_ref(), frames) {
            (Some(picture), Some(frames)) => {
                *imp.animation.borrow_mut() = FramePlayer::start(picture, frames);
            }
            (picture, None) => {
                if let Some(picture) = picture {
                    picture.set_paintable(Option::<&Texture>::None);
                }
                self.add_css_class("media-tile-failed");
            }
            (None, Some(_)) => {}
        }
        self.set_loading(false);
    }

    fn set_loading(&self, loading: bool) {
        let imp = self.imp();
        if let Some(spinner) = imp.spinner.borrow().as_ref() {
            spinner.set_spinning(loading);
            spinner.set_visible(loading);
        }
        if let Some(picture) = imp.picture.borrow().as_ref() {
            picture.set_opacity(if loading { 0.0 } else { 1.0 });
        }
        let min_height = if loading { LOADING_HEIGHT_PX } else { -1 };
        self.set_size_request(-1, min_height);
    }

    pub fn path(&self) -> PathBuf {
        self.imp().path.borrow().clone()
    }

    pub fn connect_activated<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.imp().on_activated.borrow_mut() = Some(Rc::new(callback));
    }

    fn emit_activated(&self) {
        let imp = self.imp();
        let callback = imp.on_activated.borrow().clone();
        if let Some(callback) = callback {
            callback(imp.index.get());
        }
    }
}
