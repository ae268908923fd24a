use anyhow::Context;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::auth::AccountService;
use crate::backend::models::Snippet;
use crate::backend::SupabaseClient;
use crate::colors::ColorExtractor;
use crate::config::Config;
use crate::deezer::DeezerClient;
use crate::enrich::ArtistArtResolver;
use crate::lyrics::{self, LrclibClient, LyricSheet, LyricsOutcome, SongRef};
use crate::pipeline::{BackfillReport, SnippetPipeline};
use crate::search::{RecentSearches, SearchFlow, SearchSettings};
use crate::snippets::{SnippetRepository, SnippetsView};
use crate::social::SocialService;
use crate::storage::prefs::{self, SnippetsLayout};
use crate::storage::StorageHandle;

/// Every service, wired from one config.
pub struct App {
    cfg: Config,
    storage: StorageHandle,
    backend: Arc<SupabaseClient>,
    deezer: Arc<DeezerClient>,
    lrclib: LrclibClient,
    pub accounts: AccountService,
    pub pipeline: SnippetPipeline,
    pub social: SocialService,
}

impl App {
    pub fn new(cfg: Config) -> anyhow::Result<Self> {
        let storage = StorageHandle::new(cfg.local_db_path());
        let backend = Arc::new(
            SupabaseClient::new(&cfg, storage.clone()).context("init backend client")?,
        );
        let deezer = Arc::new(DeezerClient::new(&cfg).context("init deezer client")?);
        let lrclib = LrclibClient::new(&cfg).context("init lrclib client")?;

        let repo = SnippetRepository::new(backend.clone(), backend.clone());
        let artists = ArtistArtResolver::new(repo.clone(), deezer.clone());
        let pipeline =
            SnippetPipeline::new(repo, artists, ColorExtractor::shared(cfg.colors.enabled));
        let social = SocialService::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            pipeline.clone(),
        );
        let accounts = AccountService::new(backend.clone(), backend.clone());

        Ok(Self {
            cfg,
            storage,
            backend,
            deezer,
            lrclib,
            accounts,
            pipeline,
            social,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    pub fn repo(&self) -> &SnippetRepository {
        self.pipeline.repo()
    }

    pub async fn search_flow(&self) -> SearchFlow {
        let recent = RecentSearches::load(self.storage.clone(), self.cfg.search.recent_limit).await;
        SearchFlow::new(
            self.deezer.clone(),
            self.backend.clone(),
            SearchSettings::from_config(&self.cfg),
            recent,
        )
    }

    pub async fn lyrics(&self, song: &SongRef) -> LyricsOutcome {
        lyrics::resolve_lyrics(&self.lrclib, song).await
    }

    /// Lyrics for an existing snippet with its saved lines selected.
    pub async fn snippet_sheet(&self, snippet: &Snippet) -> (LyricsOutcome, Option<LyricSheet>) {
        let song = SongRef {
            title: snippet.song_title.clone(),
            artist_names: snippet.artist_name.clone(),
            album_name: None,
            duration: None,
        };
        let outcome = self.lyrics(&song).await;
        let sheet = match &outcome {
            LyricsOutcome::Lines(lines) => {
                let mut sheet = LyricSheet::new(lines.clone()).read_only();
                sheet.preselect(&snippet.lyrics);
                Some(sheet)
            }
            _ => None,
        };
        (outcome, sheet)
    }

    /// The signed-in user's snippets in their saved layout, with colors
    /// backfilled until `cancel` fires.
    pub async fn my_snippets(&self, cancel: &CancellationToken) -> (SnippetsView, BackfillReport) {
        let layout = prefs::load::<SnippetsLayout>(&self.storage).await;
        let mut view = SnippetsView::new(self.repo().list_mine().await, layout);
        let report = self.pipeline.backfill(&mut view, cancel).await;
        (view, report)
    }
}

/// Parse 1-based line picks such as `2,4-6` into sorted, distinct 0-based
/// indices.
pub fn parse_line_picks(picks_arg: &str) -> anyhow::Result<Vec<usize>> {
    let mut picks = BTreeSet::new();
    for part in picks_arg.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (part, part),
        };
        let start: usize = start.parse().with_context(|| format!("bad line number {start:?}"))?;
        let end: usize = end.parse().with_context(|| format!("bad line number {end:?}"))?;
        anyhow::ensure!(start >= 1 && start <= end, "bad line range {part:?}");
        picks.extend((start - 1)..end);
    }
    anyhow::ensure!(!picks.is_empty(), "no lines selected");
    Ok(picks.into_iter().collect())
}

/// Select `picks_arg` on freshly fetched lyrics and compose the snippet text.
pub fn compose_picks(outcome: LyricsOutcome, picks_arg: &str) -> anyhow::Result<String> {
    let picks = parse_line_picks(picks_arg)?;
    let LyricsOutcome::Lines(lines) = outcome else {
        anyhow::bail!(outcome.message().unwrap_or("No lyrics available."));
    };
    let mut sheet = LyricSheet::new(lines);
    for i in picks {
        anyhow::ensure!(i < sheet.lines().len(), "line {} is out of range", i + 1);
        sheet.toggle(i);
    }
    sheet.compose().context("no lines selected")
}

/// Only an explicit yes confirms a destructive action.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
