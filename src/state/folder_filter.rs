use std::collections::BTreeSet;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::models::{MediaItem, MediaLibrary};

/// Which of the library's folders feed the media sequence.
#[derive(Debug, Clone, Default)]
pub struct FolderFilter {
    known: BTreeSet<String>,
    enabled: BTreeSet<String>,
}

impl FolderFilter {
    /// Every folder of the library, all enabled.
    pub fn from_library(library: &MediaLibrary) -> Self {
        let known: BTreeSet<String> = library.folder_names().map(str::to_owned).collect();
        Self {
            enabled: known.clone(),
            known,
        }
    }

    pub fn known(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }

    pub fn is_enabled(&self, folder: &str) -> bool {
        self.enabled.contains(folder)
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled.len()
    }

    /// Flips a folder's membership. Unknown folders are ignored and return
    /// false.
    pub fn toggle(&mut self, folder: &str) -> bool {
        if !self.known.contains(folder) {
            return false;
        }
        if !self.enabled.remove(folder) {
            self.enabled.insert(folder.to_owned());
        }
        true
    }

    /// Enables or disables every known folder. Returns true if anything
    /// changed.
    pub fn set_all(&mut self, enabled: bool) -> bool {
        let next = if enabled {
            self.known.clone()
        } else {
            BTreeSet::new()
        };
        if next == self.enabled {
            return false;
        }
        self.enabled = next;
        true
    }

    /// Media of the enabled folders, merged in folder order and shuffled.
    pub fn sequence(&self, library: &MediaLibrary, seed: u64) -> Vec<MediaItem> {
        let merged: Vec<MediaItem> = self
            .enabled
            .iter()
            .flat_map(|folder| library.folder(folder).iter().cloned())
            .collect();
        shuffle(merged, seed)
    }
}

/// Seeded permutation: items are ranked by a hash of their path, ties broken
/// by path, so the same seed always yields the same order.
pub fn shuffle(mut items: Vec<MediaItem>, seed: u64) -> Vec<MediaItem> {
    items.sort_by_cached_key(|item| (shuffle_rank(seed, &item.path), item.path.clone()));
    items
}

fn shuffle_rank(seed: u64, path: &Path) -> u64 {
    xxh3_64_with_seed(path.as_os_str().as_encoded_bytes(), seed)
}

pub fn new_shuffle_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e3779b97f4a7c15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn item(folder: &str, name: &str) -> MediaItem {
        MediaItem::new(PathBuf::from(format!("/media/{folder}/{name}")), folder).unwrap()
    }

    fn library() -> MediaLibrary {
        let mut folders = BTreeMap::new();
        folders.insert(
            "folder1".to_string(),
            vec![item("folder1", "a.png"), item("folder1", "b.jpg")],
        );
        folders.insert("folder2".to_string(), vec![item("folder2", "c.mp4")]);
        MediaLibrary::from_folders(folders)
    }

    #[test]
    fn test_all_folders_enabled_initially() {
        let filter = FolderFilter::from_library(&library());
        assert_eq!(filter.known().collect::<Vec<_>>(), vec!["folder1", "folder2"]);
        assert!(filter.is_enabled("folder1"));
        assert!(filter.is_enabled("folder2"));
        assert_eq!(filter.sequence(&library(), 7).len(), 3);
    }

    #[test]
    fn test_deselecting_folder_removes_its_media() {
        let library = library();
        let mut filter = FolderFilter::from_library(&library);

        assert!(filter.toggle("folder1"));
        let sequence = filter.sequence(&library, 42);
        assert_eq!(sequence.len(), 1);
        assert!(sequence.iter().all(|i| i.folder == "folder2"));

        assert!(filter.toggle("folder1"));
        assert_eq!(filter.sequence(&library, 42).len(), 3);
    }

    #[test]
    fn test_unknown_folder_is_ignored() {
        let mut filter = FolderFilter::from_library(&library());
        assert!(!filter.toggle("folder9"));
        assert_eq!(filter.enabled_count(), 2);
    }

    #[test]
    fn test_set_all() {
        let library = library();
        let mut filter = FolderFilter::from_library(&library);
        assert!(!filter.set_all(true));
        assert!(filter.set_all(false));
        assert!(filter.sequence(&library, 1).is_empty());
        assert!(filter.set_all(true));
        assert_eq!(filter.enabled_count(), 2);
    }

    #[test]
    fn test_shuffle_is_a_permutation_and_seeded() {
        let items: Vec<MediaItem> = (0..50).map(|i| item("f", &format!("{i}.png"))).collect();

        let once = shuffle(items.clone(), 99);
        let again = shuffle(items.clone(), 99);
        assert_eq!(once, again);

        let mut sorted_once: Vec<_> = once.iter().map(|i| i.path.clone()).collect();
        let mut sorted_items: Vec<_> = items.iter().map(|i| i.path.clone()).collect();
        sorted_once.sort();
        sorted_items.sort();
        assert_eq!(sorted_once, sorted_items);

        assert_ne!(shuffle(items.clone(), 1), shuffle(items, 2));
    }
}
