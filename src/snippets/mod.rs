//! Snippet records scoped to the signed-in user or to any user id.

pub mod view;

use std::sync::Arc;

use crate::backend::models::{AuthUser, NewSnippet, Snippet};
use crate::backend::{AuthApi, SnippetTable};
use crate::colors::ColorPair;
use crate::error::{AppError, AppResult};

pub use view::SnippetsView;

/// A snippet ready to store; the owner is attached from the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetRecord {
    pub song_title: String,
    pub artist_name: String,
    pub album_art_url: Option<String>,
    pub artist_art_url: Option<String>,
    pub lyrics: String,
    pub color: Option<ColorPair>,
}

impl SnippetRecord {
    fn into_row(self, user_id: &str) -> NewSnippet {
        NewSnippet {
            user_id: user_id.to_string(),
            song_title: self.song_title.trim().to_string(),
            artist_name: self.artist_name.trim().to_string(),
            album_art_url: self.album_art_url,
            artist_art_url: self.artist_art_url,
            lyrics: self.lyrics.trim().to_string(),
            color: self.color.map(|c| c.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct SnippetRepository {
    auth: Arc<dyn AuthApi>,
    table: Arc<dyn SnippetTable>,
}

impl SnippetRepository {
    pub fn new(auth: Arc<dyn AuthApi>, table: Arc<dyn SnippetTable>) -> Self {
        Self { auth, table }
    }

    pub async fn require_user(&self) -> AppResult<AuthUser> {
        self.auth
            .current_user()
            .await?
            .ok_or(AppError::NotAuthenticated)
    }

    /// The signed-in user's snippets, newest first. Any failure is logged and
    /// reads as an empty list.
    pub async fn list_mine(&self) -> Vec<Snippet> {
        self.try_list_mine().await.unwrap_or_else(|e| {
            tracing::warn!("loading snippets failed: {e}");
            Vec::new()
        })
    }

    async fn try_list_mine(&self) -> AppResult<Vec<Snippet>> {
        let user = self.require_user().await?;
        self.table.list_by_user(&user.id).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> Vec<Snippet> {
        self.table.list_by_user(user_id).await.unwrap_or_else(|e| {
            tracing::warn!("loading snippets for {user_id} failed: {e}");
            Vec::new()
        })
    }

    pub async fn insert(&self, record: SnippetRecord) -> AppResult<()> {
        let user = self.require_user().await?;
        let row = record.into_row(&user.id);
        self.table.insert(&row).await?;
        tracing::info!("saved snippet for {:?} by {:?}", row.song_title, row.artist_name);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.table.delete(id).await?;
        tracing::info!("deleted snippet {id}");
        Ok(())
    }

    pub async fn update_color(&self, id: &str, color: &ColorPair) -> AppResult<()> {
        self.table.update_color(id, color).await
    }

    /// Replace the mutable fields of `snippet` on its stored row.
    pub async fn update(&self, snippet: &Snippet) -> AppResult<()> {
        self.table.update(snippet).await?;
        tracing::info!("updated snippet {}", snippet.id);
        Ok(())
    }

    pub async fn find_artist_art(&self, artist_name: &str) -> AppResult<Option<String>> {
        self.table.find_artist_art(artist_name).await
    }

    pub async fn count_for_user(&self, user_id: &str) -> AppResult<u64> {
        self.table.count_by_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{snippet, MemoryBackend};
    use std::sync::atomic::Ordering;

    fn repo(backend: &Arc<MemoryBackend>) -> SnippetRepository {
        SnippetRepository::new(backend.clone(), backend.clone())
    }

    #[tokio::test]
    async fn insert_trims_and_takes_owner_from_session() {
        let backend = Arc::new(MemoryBackend::signed_in("me"));
        let repo = repo(&backend);
        repo.insert(SnippetRecord {
            song_title: "  Imagine ".into(),
            artist_name: " John Lennon ".into(),
            lyrics: "\n Imagine all the people \n".into(),
            color: Some(ColorPair::fallback()),
            ..Default::default()
        })
        .await
        .unwrap();

        let mine = repo.list_mine().await;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, "me");
        assert_eq!(mine[0].song_title, "Imagine");
        assert_eq!(mine[0].artist_name, "John Lennon");
        assert_eq!(mine[0].lyrics, "Imagine all the people");
        assert_eq!(mine[0].color.as_deref(), Some("#8B8E98|#6B6E78"));
    }

    #[tokio::test]
    async fn signed_out_insert_fails_before_writing() {
        let backend = Arc::new(MemoryBackend::default());
        let err = repo(&backend)
            .insert(SnippetRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAuthenticated));
        assert_eq!(backend.insert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_failures_read_as_empty() {
        let backend = Arc::new(MemoryBackend::default());
        backend.seed_snippet(snippet("a", "me", "X"));
        let repo = repo(&backend);
        assert!(repo.list_mine().await.is_empty());

        backend.fail_reads.store(true, Ordering::SeqCst);
        assert!(repo.list_for_user("me").await.is_empty());
    }

    #[tokio::test]
    async fn lists_are_newest_first() {
        let backend = Arc::new(MemoryBackend::signed_in("me"));
        backend.seed_snippet(snippet("old", "me", "X"));
        backend.seed_snippet(snippet("other", "you", "X"));
        backend.seed_snippet(snippet("new", "me", "X"));
        let ids: Vec<String> = repo(&backend)
            .list_mine()
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn write_failures_propagate() {
        let backend = Arc::new(MemoryBackend::signed_in("me"));
        backend.fail_writes.store(true, Ordering::SeqCst);
        let repo = repo(&backend);
        assert!(repo.delete("x").await.is_err());
        assert!(repo
            .update_color("x", &ColorPair::fallback())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn update_rewrites_only_the_matching_row() {
        let backend = Arc::new(MemoryBackend::signed_in("me"));
        let mut seeded = snippet("a", "me", "X");
        seeded.created_at = "2025-03-01T10:00:00+00:00".into();
        backend.seed_snippet(seeded);
        backend.seed_snippet(snippet("b", "me", "X"));
        let repo = repo(&backend);

        let mut edited = backend.snippet("a").unwrap();
        edited.created_at = "1970-01-01T00:00:00+00:00".into();
        edited.lyrics = "new line".into();
        edited.color = Some("#112233|#445566".into());
        edited.user_id = "someone-else".into();
        repo.update(&edited).await.unwrap();

        let a = backend.snippet("a").unwrap();
        assert_eq!(a.lyrics, "new line");
        assert_eq!(a.color.as_deref(), Some("#112233|#445566"));
        assert_eq!(a.user_id, "me");
        assert_eq!(a.created_at, "2025-03-01T10:00:00+00:00");
        assert_eq!(backend.snippet("b"), Some(snippet("b", "me", "X")));

        backend.fail_writes.store(true, Ordering::SeqCst);
        edited.lyrics = "lost".into();
        assert!(repo.update(&edited).await.is_err());
        assert_eq!(backend.snippet("a").unwrap().lyrics, "new line");
    }
}
