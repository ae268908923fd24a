use serde::{Deserialize, Serialize};

use crate::deezer::SongHit;
use crate::storage::{unix_now_millis, StorageHandle, KEY_RECENT_SEARCHES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    #[serde(flatten)]
    pub song: SongHit,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

/// Prepend `song`, dropping any older entry with the same id, and cap the list.
pub fn push_recent(entries: &mut Vec<RecentSearch>, song: SongHit, timestamp: i64, limit: usize) {
    entries.retain(|e| e.song.id != song.id);
    entries.insert(0, RecentSearch { song, timestamp });
    entries.truncate(limit);
}

/// Most-recently-selected songs, persisted as a JSON array.
#[derive(Debug, Clone)]
pub struct RecentSearches {
    storage: StorageHandle,
    limit: usize,
    entries: Vec<RecentSearch>,
}

impl RecentSearches {
    pub fn new(storage: StorageHandle, limit: usize, entries: Vec<RecentSearch>) -> Self {
        Self {
            storage,
            limit,
            entries,
        }
    }

    pub async fn load(storage: StorageHandle, limit: usize) -> Self {
        let entries = match storage.get_json::<Vec<RecentSearch>>(KEY_RECENT_SEARCHES).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("read recent searches: {e:#}");
                Vec::new()
            }
        };
        Self::new(storage, limit, entries)
    }

    pub fn entries(&self) -> &[RecentSearch] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn record(&mut self, song: SongHit) -> anyhow::Result<()> {
        push_recent(&mut self.entries, song, unix_now_millis(), self.limit);
        self.storage.set_json(KEY_RECENT_SEARCHES, &self.entries).await
    }
}
