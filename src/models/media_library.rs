//! Folder-partitioned media collection for the mosaic gallery.
//!
//! The library is the startup input of the app: a media root directory whose
//! immediate subdirectories are the selectable folders. Files directly inside
//! the root form one extra folder named after the root itself.
//!
//! Scanning is non-recursive within each folder, skips hidden entries and
//! keeps only files the classifier recognises.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::task;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::MediaItem;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("media root does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("media root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Configuration for the library scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links.
    pub follow_symlinks: bool,
    /// Whether dot-files and dot-directories are included.
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            include_hidden: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaLibrary {
    root: Option<PathBuf>,
    folders: BTreeMap<String, Vec<MediaItem>>,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

impl MediaLibrary {
    /// Build a library from an already partitioned collection.
    pub fn from_folders(folders: BTreeMap<String, Vec<MediaItem>>) -> Self {
        Self {
            root: None,
            folders,
        }
    }

    /// Scans a media root synchronously.
    pub fn scan(root: &Path, config: &ScanConfig) -> Result<Self> {
        if !root.exists() {
            return Err(LibraryError::MissingRoot(root.to_path_buf()).into());
        }
        if !root.is_dir() {
            return Err(LibraryError::NotADirectory(root.to_path_buf()).into());
        }

        info!("Scanning media root {:?}", root);
        let mut folders = BTreeMap::new();

        let root_items = Self::scan_folder(root, &folder_name(root), config)?;
        if !root_items.is_empty() {
            folders.insert(folder_name(root), root_items);
        }

        let entries = std::fs::read_dir(root)
            .with_context(|| format!("Failed to read media root: {:?}", root))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || (!config.include_hidden && is_hidden(&path)) {
                continue;
            }
            let mut name = folder_name(&path);
            if folders.contains_key(&name) {
                // Loose root files already own this id.
                name = format!("{}/{}", folder_name(root), name);
                debug!("Folder {:?} renamed to {:?}", path, name);
            }
            match Self::scan_folder(&path, &name, config) {
                Ok(items) if !items.is_empty() => {
                    folders.insert(name, items);
                }
                Ok(_) => debug!("Skipping folder without media: {:?}", path),
                Err(err) => warn!(error = ?err, "Failed to scan folder {:?}", path),
            }
        }

        let library = Self {
            root: Some(root.to_path_buf()),
            folders,
        };
        info!(
            "Scan complete: {} folders, {} media items",
            library.folder_count(),
            library.len()
        );
        Ok(library)
    }

    /// Scans a media root on the blocking pool of the current tokio runtime.
    pub async fn scan_async(root: PathBuf, config: ScanConfig) -> Result<Self> {
        task::spawn_blocking(move || Self::scan(&root, &config))
            .await
            .context("Scan task panicked")?
    }

    fn scan_folder(dir: &Path, name: &str, config: &ScanConfig) -> Result<Vec<MediaItem>> {
        let walker = WalkDir::new(dir)
            .follow_links(config.follow_symlinks)
            .min_depth(1)
            .max_depth(1);

        let mut items = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = ?err, "Failed to read entry in {:?}", dir);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if !config.include_hidden && is_hidden(entry.path()) {
                continue;
            }
            if let Some(item) = MediaItem::new(entry.path().to_path_buf(), name) {
                items.push(item);
            }
        }

        items.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(items)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Folder identifiers in stable (sorted) order.
    pub fn folder_names(&self) -> impl Iterator<Item = &str> {
        self.folders.keys().map(String::as_str)
    }

    pub fn folder(&self, name: &str) -> &[MediaItem] {
        self.folders.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn len(&self) -> usize {
        self.folders.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
