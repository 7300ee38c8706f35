use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Unknown,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "gif" | "png" | "jpg" | "jpeg" | "svg" => Self::Image,
            "mp4" => Self::Video,
            _ => Self::Unknown,
        }
    }

    /// Classify a locator by its file extension. Total: anything without a
    /// supported extension is `Unknown`.
    pub fn classify(locator: impl AsRef<Path>) -> Self {
        locator
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    pub fn is_supported(self) -> bool {
        self != Self::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub path: PathBuf,
    pub kind: MediaKind,
    /// Identifier of the folder the item was discovered in
    pub folder: String,
}

impl MediaItem {
    /// Build an item for a supported file. Returns `None` for unknown types.
    pub fn new(path: PathBuf, folder: impl Into<String>) -> Option<Self> {
        let kind = MediaKind::classify(&path);
        if !kind.is_supported() {
            return None;
        }
        Some(Self {
            path,
            kind,
            folder: folder.into(),
        })
    }

    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        for name in ["a.gif", "a.png", "a.jpg", "a.jpeg", "a.svg"] {
            assert_eq!(MediaKind::classify(name), MediaKind::Image, "{}", name);
        }
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(MediaKind::classify("/m/IMG_001.JPG"), MediaKind::Image);
        assert_eq!(MediaKind::classify("clip.Mp4"), MediaKind::Video);
        assert_eq!(MediaKind::classify("photo.JpEg"), MediaKind::Image);
        assert_eq!(MediaKind::classify("CLIP.MP4"), MediaKind::Video);
    }

    #[test]
    fn test_unknown_extensions() {
        assert_eq!(MediaKind::classify("movie.webm"), MediaKind::Unknown);
        assert_eq!(MediaKind::classify("README"), MediaKind::Unknown);
        assert_eq!(MediaKind::classify(""), MediaKind::Unknown);
        assert_eq!(MediaKind::classify("archive.png.zip"), MediaKind::Unknown);
    }

    #[test]
    fn test_new_rejects_unknown() {
        assert!(MediaItem::new(PathBuf::from("notes.txt"), "f").is_none());
        let item = MediaItem::new(PathBuf::from("/media/f/clip.mp4"), "f").unwrap();
        assert!(item.is_video());
        assert_eq!(item.file_name(), "clip.mp4");
    }
}
