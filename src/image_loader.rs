use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

/// Straight RGBA8 pixels ready to be wrapped in a `gdk::MemoryTexture`.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One frame of an animation and how long it stays on screen.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: DecodedImage,
    pub delay: Duration,
}

/// Frames kept per animation; longer GIFs loop over their opening frames.
pub const MAX_ANIMATION_FRAMES: usize = 240;
/// Pixel bytes kept per animation.
const MAX_ANIMATION_BYTES: usize = 96 * 1024 * 1024;

/// Vector images are left to GTK's own loaders; everything else goes through
/// the `image` crate on a worker thread.
pub fn is_raster(path: &Path) -> bool {
    !path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false)
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))
}

fn open_image(bytes: Vec<u8>, path: &Path) -> Result<DynamicImage> {
    let format = image::guess_format(&bytes).ok();

    // A still decode of an animated GIF is its first frame.
    if format == Some(ImageFormat::Gif) {
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
        let mut frames = decoder.into_frames();
        if let Some(frame) = frames.next() {
            let frame = frame.context("Failed to decode GIF frame")?;
            return Ok(DynamicImage::ImageRgba8(frame.into_buffer()));
        }
        return Err(anyhow!("GIF has no frames: {:?}", path));
    }

    match format {
        Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
        None => image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
    }
}

/// Frame delay as browsers play it: 10ms or less means 100ms.
pub fn frame_delay(delay_ms: u32) -> Duration {
    Duration::from_millis(if delay_ms <= 10 { 100 } else { delay_ms as u64 })
}

fn scale_rgba(img: DynamicImage, max_edge: u32, path: &Path) -> Result<DecodedImage> {
    let (width, height) = img.dimensions();
    let img = if width > max_edge || height > max_edge {
        img.thumbnail(max_edge, max_edge)
    } else {
        img
    };
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("Image has no pixels: {:?}", path));
    }
    Ok(DecodedImage {
        rgba: img.to_rgba8().into_raw(),
        width,
        height,
    })
}

/// Decodes `path` shrunk so neither edge exceeds `max_edge`, keeping the
/// aspect ratio; smaller images keep their size. Animated GIFs yield every
/// frame, other formats a single frame with a zero delay.
pub fn decode_frames(path: &Path, max_edge: u32) -> Result<Vec<DecodedFrame>> {
    let bytes = read_image(path)?;
    if image::guess_format(&bytes).ok() != Some(ImageFormat::Gif) {
        return Ok(vec![DecodedFrame {
            image: scale_rgba(open_image(bytes, path)?, max_edge, path)?,
            delay: Duration::ZERO,
        }]);
    }

    let decoder = GifDecoder::new(Cursor::new(bytes))
        .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
    let mut frames = Vec::new();
    let mut total_bytes = 0usize;
    for frame in decoder.into_frames().take(MAX_ANIMATION_FRAMES) {
        let frame = match frame {
            Ok(frame) => frame,
            // Truncated GIFs still play the frames that decoded.
            Err(err) if !frames.is_empty() => {
                debug!("GIF {:?} cut short: {}", path, err);
                break;
            }
            Err(err) => return Err(err).context("Failed to decode GIF frame"),
        };
        let (numer, denom) = frame.delay().numer_denom_ms();
        let delay_ms = if denom == 0 { 0 } else { numer / denom };
        let image = scale_rgba(DynamicImage::ImageRgba8(frame.into_buffer()), max_edge, path)?;

        total_bytes = total_bytes.saturating_add(image.rgba.len());
        if total_bytes > MAX_ANIMATION_BYTES && !frames.is_empty() {
            debug!("GIF {:?} truncated at {} frames", path, frames.len());
            break;
        }
        frames.push(DecodedFrame {
            image,
            delay: frame_delay(delay_ms),
        });
    }

    if frames.is_empty() {
        return Err(anyhow!("GIF has no frames: {:?}", path));
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn decode_scaled(path: &Path, max_edge: u32) -> Result<DecodedImage> {
        let mut frames = decode_frames(path, max_edge)?;
        Ok(frames.remove(0).image)
    }

    fn write_gif(path: &Path, delays_ms: &[u32]) {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            let frames = delays_ms.iter().enumerate().map(|(i, &ms)| {
                let shade = (i as u8).wrapping_mul(60);
                Frame::from_parts(
                    RgbaImage::from_pixel(8, 4, Rgba([shade, 0, 0, 255])),
                    0,
                    0,
                    Delay::from_numer_denom_ms(ms, 1),
                )
            });
            encoder.encode_frames(frames).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_gif_frames_keep_their_delays() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spin.gif");
        write_gif(&path, &[50, 200, 0]);

        let frames = decode_frames(&path, 640).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].delay, Duration::from_millis(50));
        assert_eq!(frames[1].delay, Duration::from_millis(200));
        assert_eq!(frames[2].delay, Duration::from_millis(100));
        assert_eq!((frames[0].image.width, frames[0].image.height), (8, 4));
    }

    #[test]
    fn test_still_image_is_one_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("still.png");
        RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        let frames = decode_frames(&path, 2).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].delay, Duration::ZERO);
        assert_eq!((frames[0].image.width, frames[0].image.height), (2, 2));
    }

    #[test]
    fn test_short_delays_play_at_browser_speed() {
        assert_eq!(frame_delay(0), Duration::from_millis(100));
        assert_eq!(frame_delay(10), Duration::from_millis(100));
        assert_eq!(frame_delay(20), Duration::from_millis(20));
    }

    #[test]
    fn test_decode_scaled_shrinks_large_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbaImage::from_pixel(400, 100, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let decoded = decode_scaled(&path, 200).unwrap();
        assert_eq!((decoded.width, decoded.height), (200, 50));
        assert_eq!(decoded.rgba.len(), 200 * 50 * 4);
    }

    #[test]
    fn test_decode_scaled_keeps_small_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("small.png");
        RgbaImage::from_pixel(30, 40, Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let decoded = decode_scaled(&path, 640).unwrap();
        assert_eq!((decoded.width, decoded.height), (30, 40));
        assert_eq!(&decoded.rgba[..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_decode_errors_are_reported() {
        let dir = tempdir().unwrap();
        let garbage = dir.path().join("broken.jpg");
        std::fs::write(&garbage, b"not an image").unwrap();

        assert!(decode_scaled(&garbage, 640).is_err());
        assert!(decode_scaled(&dir.path().join("missing.png"), 640).is_err());
    }

    #[test]
    fn test_svg_is_not_raster() {
        assert!(!is_raster(Path::new("/a/logo.SVG")));
        assert!(is_raster(Path::new("/a/photo.jpeg")));
    }
}
