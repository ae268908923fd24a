use serde::{Deserialize, Serialize};

/// Every Deezer list endpoint answers with either a `data` page or an
/// `error` object, both with HTTP 200.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DeezerEnvelope<T> {
    Data { data: Vec<T> },
    Error { error: DeezerError },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeezerError {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: i64,
}

#[derive(Debug, Deserialize)]
pub struct RawTrack {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub artist: Option<RawTrackArtist>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
}

#[derive(Debug, Deserialize)]
pub struct RawTrackArtist {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover_medium: Option<String>,
}

/// Artist search candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtistHit {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub picture_big: Option<String>,
    #[serde(default)]
    pub picture_xl: Option<String>,
}

impl ArtistHit {
    /// Largest non-empty picture.
    pub fn best_picture(&self) -> Option<&str> {
        [&self.picture_xl, &self.picture_big, &self.picture]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .find(|p| !p.is_empty())
    }
}

/// A normalized song search result. Also the shape kept in recent searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongHit {
    pub id: u64,
    pub title: String,
    pub artist_names: String,
    #[serde(default)]
    pub song_art_image_thumbnail_url: String,
    #[serde(default)]
    pub album_name: String,
    #[serde(default)]
    pub duration: u32,
}

impl From<RawTrack> for SongHit {
    fn from(raw: RawTrack) -> Self {
        let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        let (cover, album_name) = match raw.album {
            Some(a) => (non_empty(a.cover_medium), non_empty(a.title)),
            None => (None, None),
        };
        Self {
            id: raw.id,
            title: raw.title,
            artist_names: non_empty(raw.artist.and_then(|a| a.name))
                .unwrap_or_else(|| "Unknown".to_string()),
            song_art_image_thumbnail_url: cover.unwrap_or_default(),
            album_name: album_name.unwrap_or_default(),
            duration: raw.duration.unwrap_or(0),
        }
    }
}

impl SongHit {
    pub fn album_art_url(&self) -> Option<&str> {
        Some(self.song_art_image_thumbnail_url.as_str()).filter(|u| !u.is_empty())
    }
}
