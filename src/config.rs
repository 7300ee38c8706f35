use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use directories::UserDirs;
use tracing::warn;

use crate::layout::lazy_load::{DEFAULT_PAGE_SIZE, DEFAULT_THRESHOLD_PX};

pub const MEDIA_DIR_ENV: &str = "MOSAIC_MEDIA_DIR";
pub const PAGE_SIZE_ENV: &str = "MOSAIC_PAGE_SIZE";
pub const LOAD_THRESHOLD_ENV: &str = "MOSAIC_LOAD_THRESHOLD_PX";
pub const TILE_SIZE_ENV: &str = "MOSAIC_TILE_SIZE";

/// Longest edge, in pixels, tiles are decoded at.
pub const DEFAULT_TILE_SIZE: u32 = 640;

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    /// Explicit media root. `None` falls back to the user's pictures folder.
    pub media_dir: Option<PathBuf>,
    pub page_size: usize,
    pub load_threshold_px: f64,
    pub tile_size: u32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            media_dir: None,
            page_size: DEFAULT_PAGE_SIZE,
            load_threshold_px: DEFAULT_THRESHOLD_PX,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

impl GalleryConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            media_dir: lookup(MEDIA_DIR_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            page_size: parse_or(&lookup, PAGE_SIZE_ENV, defaults.page_size, |v| *v > 0),
            load_threshold_px: parse_or(&lookup, LOAD_THRESHOLD_ENV, defaults.load_threshold_px, |v| {
                v.is_finite() && *v >= 0.0
            }),
            tile_size: parse_or(&lookup, TILE_SIZE_ENV, defaults.tile_size, |v| *v >= 64),
        }
    }

    /// Media root to scan: an explicit path wins, then the configured
    /// directory, then the pictures folder, then home.
    pub fn resolve_media_root(&self, explicit: Option<PathBuf>) -> Option<PathBuf> {
        explicit.or_else(|| self.media_dir.clone()).or_else(|| {
            let dirs = UserDirs::new()?;
            dirs.picture_dir()
                .map(PathBuf::from)
                .or_else(|| Some(dirs.home_dir().to_path_buf()))
        })
    }
}

fn parse_or<T, F>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T, valid: F) -> T
where
    T: FromStr + Copy,
    F: Fn(&T) -> bool,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = GalleryConfig::from_lookup(lookup(&[]));
        assert_eq!(config, GalleryConfig::default());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.load_threshold_px, 500.0);
    }

    #[test]
    fn test_overrides() {
        let config = GalleryConfig::from_lookup(lookup(&[
            (MEDIA_DIR_ENV, "/srv/media"),
            (PAGE_SIZE_ENV, "24"),
            (LOAD_THRESHOLD_ENV, "800.5"),
            (TILE_SIZE_ENV, "512"),
        ]));
        assert_eq!(config.media_dir, Some(PathBuf::from("/srv/media")));
        assert_eq!(config.page_size, 24);
        assert_eq!(config.load_threshold_px, 800.5);
        assert_eq!(config.tile_size, 512);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = GalleryConfig::from_lookup(lookup(&[
            (PAGE_SIZE_ENV, "0"),
            (LOAD_THRESHOLD_ENV, "-3"),
            (TILE_SIZE_ENV, "huge"),
            (MEDIA_DIR_ENV, "  "),
        ]));
        assert_eq!(config, GalleryConfig::default());
    }

    #[test]
    fn test_explicit_root_wins() {
        let config = GalleryConfig {
            media_dir: Some(PathBuf::from("/configured")),
            ..GalleryConfig::default()
        };
        assert_eq!(
            config.resolve_media_root(Some(PathBuf::from("/cli"))),
            Some(PathBuf::from("/cli"))
        );
        assert_eq!(
            config.resolve_media_root(None),
            Some(PathBuf::from("/configured"))
        );
    }
}
