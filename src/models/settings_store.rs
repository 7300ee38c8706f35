//! SQLite-backed key-value store for settings that survive reloads.
//!
//! The only setting the gallery persists today is the autoscroll speed tier,
//! stored under [`SCROLL_SPEED_KEY`] as the tier's short name.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::state::ScrollSpeedTier;

pub const SCROLL_SPEED_KEY: &str = "scroll_speed";

/// Settings database stored at `XDG_CONFIG_HOME/mosaic/settings.sqlite`.
pub struct SettingsStore {
    conn: Connection,
}

impl SettingsStore {
    /// Opens or creates the database at the default XDG location.
    pub fn open_default() -> Result<Self> {
        let db_path = Self::default_db_path()?;
        Self::open(&db_path)
    }

    /// Returns the default database path based on XDG directories.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "mosaic")
            .context("Failed to determine project directories")?;

        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory: {:?}", config_dir))?;

        Ok(config_dir.join("settings.sqlite"))
    }

    /// Opens or creates the database at the specified path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )
        .context("Failed to configure SQLite pragmas")?;

        let store = Self { conn };
        store.create_tables()?;

        info!("Opened settings store at {:?}", path);
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            ",
            )
            .context("Failed to create settings table")?;

        debug!("Settings table created/verified");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read setting {}", key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
                params![key, value, Self::now()],
            )
            .with_context(|| format!("Failed to write setting {}", key))?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    /// Reads the persisted scroll speed tier. Missing or unrecognised values
    /// yield `None` so the caller falls back to the default tier; an
    /// unrecognised value is also dropped from the table.
    pub fn speed_tier(&self) -> Result<Option<ScrollSpeedTier>> {
        let Some(raw) = self.get(SCROLL_SPEED_KEY)? else {
            return Ok(None);
        };
        let tier = ScrollSpeedTier::from_short_name(&raw);
        if tier.is_none() {
            warn!("Ignoring unknown persisted scroll speed {:?}", raw);
            self.remove(SCROLL_SPEED_KEY)?;
        }
        Ok(tier)
    }

    pub fn set_speed_tier(&self, tier: ScrollSpeedTier) -> Result<()> {
        self.set(SCROLL_SPEED_KEY, tier.short_name())
    }

    /// Returns the current Unix timestamp.
    pub fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_create() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("settings.sqlite");

        let store = SettingsStore::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites_value() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::open(&dir.path().join("s.sqlite")).unwrap();

        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));

        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_speed_tier_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("s.sqlite");

        {
            let store = SettingsStore::open(&db_path).unwrap();
            assert_eq!(store.speed_tier().unwrap(), None);
            store.set_speed_tier(ScrollSpeedTier::Fast).unwrap();
        }

        let store = SettingsStore::open(&db_path).unwrap();
        assert_eq!(store.speed_tier().unwrap(), Some(ScrollSpeedTier::Fast));
    }

    #[test]
    fn test_unknown_speed_tier_is_ignored() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::open(&dir.path().join("s.sqlite")).unwrap();
        store.set(SCROLL_SPEED_KEY, "warp").unwrap();
        assert_eq!(store.speed_tier().unwrap(), None);
        assert_eq!(store.get(SCROLL_SPEED_KEY).unwrap(), None);
    }
}
