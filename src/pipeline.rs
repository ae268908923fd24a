//! Snippet ingestion: save with enrichment, and the color backfill that runs
//! over a loaded list.

use tokio_util::sync::CancellationToken;

use crate::colors::ColorExtractor;
use crate::deezer::SongHit;
use crate::enrich::ArtistArtResolver;
use crate::error::AppResult;
use crate::snippets::{SnippetRecord, SnippetRepository, SnippetsView};

/// What the user picked: a song and the composed lyric lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetDraft {
    pub song_title: String,
    pub artist_name: String,
    pub album_art_url: Option<String>,
    pub lyrics: String,
}

impl SnippetDraft {
    pub fn from_song(song: &SongHit, lyrics: String) -> Self {
        Self {
            song_title: song.title.clone(),
            artist_name: song.artist_names.clone(),
            album_art_url: song.album_art_url().map(str::to_string),
            lyrics,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct SnippetPipeline {
    repo: SnippetRepository,
    artists: ArtistArtResolver,
    colors: &'static ColorExtractor,
}

impl SnippetPipeline {
    pub fn new(
        repo: SnippetRepository,
        artists: ArtistArtResolver,
        colors: &'static ColorExtractor,
    ) -> Self {
        Self {
            repo,
            artists,
            colors,
        }
    }

    pub fn repo(&self) -> &SnippetRepository {
        &self.repo
    }

    /// Store a new snippet with its album-art color and artist image. Only
    /// the auth check and the insert can fail.
    pub async fn save(&self, draft: SnippetDraft) -> AppResult<()> {
        self.repo.require_user().await?;

        let color = self.colors.extract(draft.album_art_url.as_deref()).await;
        let artist_art_url = self.artists.resolve(&draft.artist_name).await;

        self.repo
            .insert(SnippetRecord {
                song_title: draft.song_title,
                artist_name: draft.artist_name,
                album_art_url: draft.album_art_url,
                artist_art_url,
                lyrics: draft.lyrics,
                color,
            })
            .await
    }

    /// Derive and store colors for snippets that lack one, one at a time.
    /// Cancellation is checked between items.
    pub async fn backfill(
        &self,
        view: &mut SnippetsView,
        cancel: &CancellationToken,
    ) -> BackfillReport {
        let mut report = BackfillReport::default();

        for (id, album_art_url) in view.needing_color() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let Some(color) = self.colors.extract(Some(&album_art_url)).await else {
                report.skipped += 1;
                continue;
            };

            match self.repo.update_color(&id, &color).await {
                Ok(()) => {
                    view.apply_color(&id, &color);
                    report.updated += 1;
                }
                Err(e) => {
                    tracing::warn!("storing color for snippet {id} failed: {e}");
                    report.failed += 1;
                }
            }
        }

        if report.updated + report.failed > 0 || report.cancelled {
            tracing::debug!(
                "color backfill: {} updated, {} skipped, {} failed{}",
                report.updated,
                report.skipped,
                report.failed,
                if report.cancelled { ", cancelled" } else { "" }
            );
        }
        report
    }
}
