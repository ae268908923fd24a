//! Debounced song and friend search with a dropdown and recent searches.
//!
//! Each input restarts a timer task. When it fires the task runs the query and
//! reports back over a channel; the flow applies a result only if no newer
//! input has arrived since (generation check).

pub mod recent;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::models::Profile;
use crate::backend::ProfileTable;
use crate::config::Config;
use crate::deezer::{SongHit, SongSearch};
use crate::error::AppResult;

pub use recent::RecentSearches;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Songs,
    Friends,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    Results,
    NoResults,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHit {
    pub id: String,
    pub full_name: String,
    pub profile_image_url: String,
}

impl From<Profile> for UserHit {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            full_name: p.full_name.unwrap_or_default(),
            profile_image_url: p.profile_image_url.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchHit {
    Song(SongHit),
    User(UserHit),
}

/// What the caller should open after a pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    OpenProfile(String),
    OpenLyrics(SongHit),
}

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub song_limit: usize,
    pub friend_limit: usize,
}

impl SearchSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            debounce: cfg.debounce(),
            song_limit: cfg.search.song_limit,
            friend_limit: cfg.search.friend_limit,
        }
    }
}

#[derive(Debug)]
struct SearchEvent {
    generation: u64,
    mode: SearchMode,
    result: AppResult<Vec<SearchHit>>,
}

pub struct SearchFlow {
    songs: Arc<dyn SongSearch>,
    profiles: Arc<dyn ProfileTable>,
    settings: SearchSettings,
    recent: RecentSearches,

    mode: SearchMode,
    query: String,
    status: SearchStatus,
    results: Vec<SearchHit>,
    message: Option<&'static str>,
    open: bool,

    generation: u64,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<SearchEvent>,
    rx: mpsc::UnboundedReceiver<SearchEvent>,
}

impl SearchFlow {
    pub fn new(
        songs: Arc<dyn SongSearch>,
        profiles: Arc<dyn ProfileTable>,
        settings: SearchSettings,
        recent: RecentSearches,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            songs,
            profiles,
            settings,
            recent,
            mode: SearchMode::default(),
            query: String::new(),
            status: SearchStatus::default(),
            results: Vec::new(),
            message: None,
            open: false,
            generation: 0,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn results(&self) -> &[SearchHit] {
        &self.results
    }

    /// Empty-state or failure text for the dropdown.
    pub fn message(&self) -> Option<&'static str> {
        self.message
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn recent(&self) -> &RecentSearches {
        &self.recent
    }

    pub fn shows_history(&self) -> bool {
        self.query.trim().is_empty() && self.mode == SearchMode::Songs && !self.recent.is_empty()
    }

    fn cancel_pending(&mut self) {
        self.generation += 1;
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    fn reset_results(&mut self) {
        self.results.clear();
        self.message = None;
        self.status = SearchStatus::Idle;
    }

    pub fn focus(&mut self) {
        if self.query.trim().is_empty() && !self.recent.is_empty() {
            self.open = true;
        }
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.cancel_pending();
        self.reset_results();
        self.open = false;
    }

    /// Record new query text and restart the debounce timer.
    pub fn input(&mut self, text: &str) {
        self.query = text.to_string();
        self.cancel_pending();

        let query = text.trim().to_string();
        if query.is_empty() {
            self.reset_results();
            self.open = false;
            return;
        }

        self.status = SearchStatus::Searching;
        self.message = None;
        self.open = true;

        let generation = self.generation;
        let mode = self.mode;
        let settings = self.settings;
        let songs = self.songs.clone();
        let profiles = self.profiles.clone();
        let tx = self.tx.clone();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(settings.debounce).await;
            let result = match mode {
                SearchMode::Songs => songs
                    .search_songs(&query, settings.song_limit)
                    .await
                    .map(|hits| hits.into_iter().map(SearchHit::Song).collect()),
                SearchMode::Friends => profiles
                    .search_by_name(&query, settings.friend_limit)
                    .await
                    .map(|hits| hits.into_iter().map(|p| SearchHit::User(p.into())).collect()),
            };
            let _ = tx.send(SearchEvent {
                generation,
                mode,
                result,
            });
        }));
    }

    fn apply(&mut self, event: SearchEvent) {
        if event.generation != self.generation {
            tracing::debug!("dropping superseded search result");
            return;
        }
        self.pending = None;
        match event.result {
            Ok(hits) if hits.is_empty() => {
                self.results.clear();
                self.status = SearchStatus::NoResults;
                self.message = Some(match event.mode {
                    SearchMode::Songs => "No songs found",
                    SearchMode::Friends => "No users found",
                });
            }
            Ok(hits) => {
                self.results = hits;
                self.status = SearchStatus::Results;
                self.message = None;
            }
            Err(e) => {
                tracing::warn!("search failed: {e}");
                self.results.clear();
                self.status = SearchStatus::Error;
                self.message = Some("Search failed");
            }
        }
    }

    /// Wait for the in-flight search, if any, and apply its result.
    pub async fn settle(&mut self) {
        while self.status == SearchStatus::Searching {
            match self.rx.recv().await {
                Some(event) => self.apply(event),
                None => break,
            }
        }
    }

    /// Clear query and results and close the dropdown.
    pub fn close(&mut self) {
        self.cancel_pending();
        self.query.clear();
        self.reset_results();
        self.open = false;
    }

    pub async fn select(&mut self, hit: SearchHit) -> Selection {
        let selection = match hit {
            SearchHit::User(user) => Selection::OpenProfile(user.id),
            SearchHit::Song(song) => {
                if let Err(e) = self.recent.record(song.clone()).await {
                    tracing::warn!("saving recent search failed: {e:#}");
                }
                Selection::OpenLyrics(song)
            }
        };
        self.close();
        selection
    }
}

impl Drop for SearchFlow {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}
