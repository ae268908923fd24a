//! Durable local key-value store for small client-side state: preferences,
//! recent searches and the auth session.

use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

pub mod prefs;

pub const KEY_RECENT_SEARCHES: &str = "recent-searches";
pub const KEY_PROFILE_FONT: &str = "profile_font";
pub const KEY_APP_THEME: &str = "app_theme";
pub const KEY_SNIPPETS_LAYOUT: &str = "snippets_layout";
pub const KEY_SESSION: &str = "session";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key=?1", params![key], |row| row.get(0))
            .optional()
            .with_context(|| format!("read {key}"))
    }

    pub fn set(&self, key: &str, value: &str, now_unix: i64) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO kv(key, value, updated_at)
VALUES(?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value=excluded.value,
  updated_at=excluded.updated_at
"#,
                params![key, value, now_unix],
            )
            .with_context(|| format!("write {key}"))?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key=?1", params![key])
            .with_context(|| format!("delete {key}"))?;
        Ok(())
    }
}

/// Cheap cloneable handle that opens the database per operation so it can be
/// moved into `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    path: PathBuf,
}

impl StorageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open(&self) -> anyhow::Result<Storage> {
        Storage::open(&self.path)
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.open()?.get(&key))
            .await
            .context("storage task")?
    }

    pub async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        let this = self.clone();
        let key = key.to_string();
        let now = unix_now();
        tokio::task::spawn_blocking(move || this.open()?.set(&key, &value, now))
            .await
            .context("storage task")?
    }

    pub async fn remove(&self, key: &str) -> anyhow::Result<()> {
        let this = self.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || this.open()?.remove(&key))
            .await
            .context("storage task")?
    }

    /// Read a JSON value; a value that no longer parses is treated as missing.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        let Some(raw) = self.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!("ignoring unreadable {key}: {e}");
                Ok(None)
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value).with_context(|| format!("serialize {key}"))?;
        self.set(key, raw).await
    }
}

pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

pub fn unix_now_millis() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
