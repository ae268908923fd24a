use super::SnippetRepository;
use crate::backend::models::Snippet;
use crate::colors::ColorPair;
use crate::error::AppResult;
use crate::storage::prefs::SnippetsLayout;

const GRID_COLUMNS: usize = 2;

/// In-memory list of snippets as shown on a profile.
#[derive(Debug, Clone, Default)]
pub struct SnippetsView {
    items: Vec<Snippet>,
    layout: SnippetsLayout,
}

impl SnippetsView {
    pub fn new(items: Vec<Snippet>, layout: SnippetsLayout) -> Self {
        Self { items, layout }
    }

    pub fn items(&self) -> &[Snippet] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn layout(&self) -> SnippetsLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: SnippetsLayout) {
        self.layout = layout;
    }

    /// One snippet per row in list layout, pairs in grid layout.
    pub fn rows(&self) -> impl Iterator<Item = &[Snippet]> + '_ {
        let width = match self.layout {
            SnippetsLayout::List => 1,
            SnippetsLayout::Grid => GRID_COLUMNS,
        };
        self.items.chunks(width)
    }

    /// `(id, album_art_url)` of every snippet the backfill should visit.
    pub fn needing_color(&self) -> Vec<(String, String)> {
        self.items
            .iter()
            .filter(|s| s.needs_color())
            .filter_map(|s| Some((s.id.clone(), s.album_art_url.clone()?)))
            .collect()
    }

    pub fn apply_color(&mut self, id: &str, color: &ColorPair) -> bool {
        match self.items.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.color = Some(color.to_string());
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Snippet> {
        let pos = self.items.iter().position(|s| s.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Delete remotely, then drop the item locally. The list is untouched when
    /// the delete fails.
    pub async fn delete(&mut self, repo: &SnippetRepository, id: &str) -> AppResult<()> {
        repo.delete(id).await?;
        self.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::{snippet, MemoryBackend};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn view(ids: &[&str]) -> SnippetsView {
        SnippetsView::new(
            ids.iter().map(|id| snippet(id, "me", "X")).collect(),
            SnippetsLayout::List,
        )
    }

    #[tokio::test]
    async fn delete_removes_only_the_match_with_one_call() {
        let backend = Arc::new(MemoryBackend::signed_in("me"));
        for id in ["a", "b", "c"] {
            backend.seed_snippet(snippet(id, "me", "X"));
        }
        let repo = SnippetRepository::new(backend.clone(), backend.clone());
        let mut view = view(&["a", "b", "c"]);

        view.delete(&repo, "b").await.unwrap();

        let ids: Vec<&str> = view.items().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(backend.delete_calls.load(Ordering::SeqCst), 1);
        assert!(backend.snippet("b").is_none());
        assert!(backend.snippet("a").is_some());
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_item() {
        let backend = Arc::new(MemoryBackend::signed_in("me"));
        backend.fail_writes.store(true, Ordering::SeqCst);
        let repo = SnippetRepository::new(backend.clone(), backend.clone());
        let mut view = view(&["a"]);
        assert!(view.delete(&repo, "a").await.is_err());
        assert_eq!(view.items().len(), 1);
    }

    #[test]
    fn grid_rows_pair_items() {
        let mut view = view(&["a", "b", "c"]);
        assert_eq!(view.rows().count(), 3);
        view.set_layout(SnippetsLayout::Grid);
        let widths: Vec<usize> = view.rows().map(|r| r.len()).collect();
        assert_eq!(widths, vec![2, 1]);
    }

    #[test]
    fn needing_color_skips_colored_and_artless_items() {
        let mut colored = snippet("a", "me", "X");
        colored.album_art_url = Some("https://img.test/a.jpg".into());
        colored.color = Some("#111111|#222222".into());
        let mut malformed = snippet("b", "me", "X");
        malformed.album_art_url = Some("https://img.test/b.jpg".into());
        malformed.color = Some("garbage".into());
        let artless = snippet("c", "me", "X");

        let view = SnippetsView::new(vec![colored, malformed, artless], SnippetsLayout::List);
        assert_eq!(
            view.needing_color(),
            vec![("b".to_string(), "https://img.test/b.jpg".to_string())]
        );
    }
}
