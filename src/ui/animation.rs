// Frame-by-frame playback of decoded GIFs and first-frame detection for video

use gdk4::Texture;
use gtk4::prelude::*;
use gtk4::{glib, MediaFile, Picture};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::media_tile::create_texture_from_rgba;
use crate::image_loader::DecodedFrame;

/// Uploaded frames of one image. Stills have exactly one.
pub struct AnimatedFrames {
    frames: Vec<(Texture, Duration)>,
}

impl AnimatedFrames {
    /// Uploads decoded frames. Frames that fail to upload are skipped;
    /// `None` when nothing is left.
    pub fn from_decoded(decoded: Vec<DecodedFrame>) -> Option<Rc<Self>> {
        let frames: Vec<(Texture, Duration)> = decoded
            .into_iter()
            .filter_map(|frame| create_texture_from_rgba(frame.image).map(|t| (t, frame.delay)))
            .collect();
        if frames.is_empty() {
            return None;
        }
        Some(Rc::new(Self { frames }))
    }

    pub fn first(&self) -> &Texture {
        &self.frames[0].0
    }

    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// Frame shown after `index` in an animation of `len` frames.
pub fn next_frame(index: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        (index + 1) % len
    }
}

/// Loops an animation on a picture. The pending timeout is removed on drop.
pub struct FramePlayer {
    source: Rc<RefCell<Option<glib::SourceId>>>,
}

impl FramePlayer {
    /// Shows the first frame and, for animations, starts cycling.
    pub fn start(picture: &Picture, frames: Rc<AnimatedFrames>) -> Option<Self> {
        picture.set_paintable(Some(frames.first()));
        if !frames.is_animated() {
            return None;
        }
        let source = Rc::new(RefCell::new(None));
        schedule(picture.downgrade(), frames, 0, source.clone());
        Some(Self { source })
    }
}

fn schedule(
    picture: glib::WeakRef<Picture>,
    frames: Rc<AnimatedFrames>,
    index: usize,
    slot: Rc<RefCell<Option<glib::SourceId>>>,
) {
    let delay = frames.frames[index].1;
    let slot_inner = slot.clone();
    let id = glib::timeout_add_local_once(delay, move || {
        // Fired once-sources are already gone.
        slot_inner.borrow_mut().take();
        let Some(widget) = picture.upgrade() else {
            return;
        };
        let next = next_frame(index, frames.frames.len());
        widget.set_paintable(Some(&frames.frames[next].0));
        schedule(picture, frames, next, slot_inner);
    });
    *slot.borrow_mut() = Some(id);
}

impl Drop for FramePlayer {
    fn drop(&mut self) {
        if let Some(source) = self.source.borrow_mut().take() {
            source.remove();
        }
    }
}

/// Calls `callback` once, when the stream has drawn its first frame.
pub fn connect_first_frame<F>(media: &MediaFile, callback: F)
where
    F: Fn() + 'static,
{
    let handler: Rc<RefCell<Option<glib::SignalHandlerId>>> = Rc::new(RefCell::new(None));
    let handler_inner = handler.clone();
    let id = media.connect_invalidate_contents(move |media| {
        let pending = handler_inner.borrow_mut().take();
        if let Some(id) = pending {
            media.disconnect(id);
            callback();
        }
    });
    *handler.borrow_mut() = Some(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_loop_back_to_start() {
        assert_eq!(next_frame(0, 3), 1);
        assert_eq!(next_frame(2, 3), 0);
        assert_eq!(next_frame(0, 1), 0);
        assert_eq!(next_frame(4, 0), 0);
    }
}
