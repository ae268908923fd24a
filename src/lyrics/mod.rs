//! Lyrics lookup and line selection
//!
//! This module provides:
//! - LRCLIB API client
//! - The two-strategy resolver producing plain lyric lines
//! - The selection sheet used to pick snippet lines

pub mod lrclib;
pub mod sheet;

use async_trait::async_trait;

use crate::deezer::SongHit;
use crate::error::AppResult;

pub use lrclib::{LrclibClient, LrclibRecord};
pub use sheet::LyricSheet;

#[async_trait]
pub trait LyricsSource: Send + Sync {
    async fn search_structured(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> AppResult<Vec<LrclibRecord>>;
    async fn search_broad(&self, query: &str) -> AppResult<Vec<LrclibRecord>>;
}

/// What the resolver needs to know about a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRef {
    pub title: String,
    pub artist_names: String,
    pub album_name: Option<String>,
    pub duration: Option<u32>,
}

impl From<&SongHit> for SongRef {
    fn from(hit: &SongHit) -> Self {
        Self {
            title: hit.title.clone(),
            artist_names: hit.artist_names.clone(),
            album_name: Some(hit.album_name.clone()).filter(|a| !a.is_empty()),
            duration: Some(hit.duration).filter(|d| *d > 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LyricsOutcome {
    Lines(Vec<String>),
    NoLyrics,
    Failed,
}

impl LyricsOutcome {
    /// User-facing text for the empty and failure states.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            LyricsOutcome::Lines(_) => None,
            LyricsOutcome::NoLyrics => Some("No lyrics available."),
            LyricsOutcome::Failed => Some("Failed to load lyrics."),
        }
    }
}

/// Non-blank lines, trimmed, in order.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Query both LRCLIB strategies concurrently and keep the structured answer
/// when it has text.
pub async fn resolve_lyrics(source: &dyn LyricsSource, song: &SongRef) -> LyricsOutcome {
    tracing::debug!(
        "lyrics for {:?} by {:?} (album {:?}, {:?}s)",
        song.title,
        song.artist_names,
        song.album_name,
        song.duration
    );
    let broad_query = format!("{} {}", song.artist_names, song.title);
    let (structured, broad) = tokio::join!(
        source.search_structured(&song.title, &song.artist_names),
        source.search_broad(&broad_query),
    );

    if let (Err(a), Err(b)) = (&structured, &broad) {
        tracing::warn!("lyrics lookup failed for {:?}: {a}; {b}", song.title);
        return LyricsOutcome::Failed;
    }

    let text = [("structured", structured), ("broad", broad)]
        .into_iter()
        .filter_map(|(strategy, result)| match result {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::debug!("lrclib {strategy} search failed: {e}");
                None
            }
        })
        .find_map(|records| lrclib::pick_plain_lyrics(&records));

    match text.map(|t| split_lines(&t)) {
        Some(lines) if !lines.is_empty() => LyricsOutcome::Lines(lines),
        _ => LyricsOutcome::NoLyrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedLyrics {
        structured: Option<Vec<LrclibRecord>>,
        broad: Option<Vec<LrclibRecord>>,
        queries: Mutex<Vec<String>>,
    }

    fn answer(script: &Option<Vec<LrclibRecord>>) -> AppResult<Vec<LrclibRecord>> {
        script.clone().ok_or(AppError::Api {
            service: "lrclib",
            status: 500,
            message: "boom".into(),
        })
    }

    #[async_trait]
    impl LyricsSource for ScriptedLyrics {
        async fn search_structured(
            &self,
            track_name: &str,
            artist_name: &str,
        ) -> AppResult<Vec<LrclibRecord>> {
            self.queries
                .lock()
                .unwrap()
                .push(format!("structured:{track_name}/{artist_name}"));
            answer(&self.structured)
        }

        async fn search_broad(&self, query: &str) -> AppResult<Vec<LrclibRecord>> {
            self.queries.lock().unwrap().push(format!("broad:{query}"));
            answer(&self.broad)
        }
    }

    fn text(plain: &str) -> Vec<LrclibRecord> {
        vec![LrclibRecord {
            plain_lyrics: Some(plain.to_string()),
            ..Default::default()
        }]
    }

    fn song() -> SongRef {
        SongRef {
            title: "Imagine".into(),
            artist_names: "John Lennon".into(),
            album_name: None,
            duration: None,
        }
    }

    #[tokio::test]
    async fn structured_answer_wins_and_lines_are_cleaned() {
        let source = ScriptedLyrics {
            structured: Some(text("  Imagine there's no heaven \n\n It's easy if you try\n")),
            broad: Some(text("something else")),
            ..Default::default()
        };
        let outcome = resolve_lyrics(&source, &song()).await;
        assert_eq!(
            outcome,
            LyricsOutcome::Lines(vec![
                "Imagine there's no heaven".into(),
                "It's easy if you try".into()
            ])
        );
        let queries = source.queries.lock().unwrap();
        assert!(queries.contains(&"structured:Imagine/John Lennon".to_string()));
        assert!(queries.contains(&"broad:John Lennon Imagine".to_string()));
    }

    #[tokio::test]
    async fn broad_answer_fills_in() {
        let source = ScriptedLyrics {
            structured: Some(vec![]),
            broad: Some(text("from broad")),
            ..Default::default()
        };
        assert_eq!(
            resolve_lyrics(&source, &song()).await,
            LyricsOutcome::Lines(vec!["from broad".into()])
        );
    }

    #[tokio::test]
    async fn one_failed_strategy_counts_as_empty() {
        let source = ScriptedLyrics {
            structured: None,
            broad: Some(text("still here")),
            ..Default::default()
        };
        assert_eq!(
            resolve_lyrics(&source, &song()).await,
            LyricsOutcome::Lines(vec!["still here".into()])
        );

        let source = ScriptedLyrics {
            structured: None,
            broad: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(resolve_lyrics(&source, &song()).await, LyricsOutcome::NoLyrics);
    }

    #[tokio::test]
    async fn both_failing_is_distinct_from_no_lyrics() {
        let source = ScriptedLyrics::default();
        let outcome = resolve_lyrics(&source, &song()).await;
        assert_eq!(outcome, LyricsOutcome::Failed);
        assert_eq!(outcome.message(), Some("Failed to load lyrics."));
        assert_eq!(LyricsOutcome::NoLyrics.message(), Some("No lyrics available."));
    }

    #[test]
    fn song_ref_drops_placeholder_album_and_duration() {
        let hit = SongHit {
            id: 1,
            title: "Imagine".into(),
            artist_names: "John Lennon".into(),
            song_art_image_thumbnail_url: String::new(),
            album_name: String::new(),
            duration: 0,
        };
        let r = SongRef::from(&hit);
        assert_eq!(r.album_name, None);
        assert_eq!(r.duration, None);
    }
}
