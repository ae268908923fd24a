//! Artist image lookup for new snippets.

use std::sync::Arc;

use crate::deezer::models::ArtistHit;
use crate::deezer::ArtistSearch;
use crate::snippets::SnippetRepository;

const ARTIST_CANDIDATES: usize = 5;

/// Lowercased ASCII transliteration, trimmed.
pub fn normalize_artist(name: &str) -> String {
    deunicode::deunicode(name).to_lowercase().trim().to_string()
}

/// The exact normalized name match, else the first candidate, reduced to its
/// largest picture.
pub fn pick_artist_image(name: &str, candidates: &[ArtistHit]) -> Option<String> {
    let target = normalize_artist(name);
    let hit = candidates
        .iter()
        .find(|a| normalize_artist(&a.name) == target)
        .or_else(|| candidates.first())?;
    hit.best_picture().map(str::to_string)
}

/// Reuses artist art already stored on any snippet before asking the
/// artist-search API. Never fails; problems degrade to `None`.
#[derive(Clone)]
pub struct ArtistArtResolver {
    snippets: SnippetRepository,
    artists: Arc<dyn ArtistSearch>,
}

impl ArtistArtResolver {
    pub fn new(snippets: SnippetRepository, artists: Arc<dyn ArtistSearch>) -> Self {
        Self { snippets, artists }
    }

    pub async fn resolve(&self, artist_name: &str) -> Option<String> {
        let name = artist_name.trim();
        if name.is_empty() {
            return None;
        }

        match self.snippets.find_artist_art(name).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => {}
            Err(e) => tracing::debug!("stored artist art lookup failed for {name:?}: {e}"),
        }

        match self.artists.search_artists(name, ARTIST_CANDIDATES).await {
            Ok(candidates) => pick_artist_image(name, &candidates),
            Err(e) => {
                tracing::debug!("artist search failed for {name:?}: {e}");
                None
            }
        }
    }
}
