use serde::{Deserialize, Serialize};

use crate::colors::ColorPair;

/// A saved lyric excerpt, as stored in `lyric_snippets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub user_id: String,
    pub song_title: String,
    pub artist_name: String,
    pub album_art_url: Option<String>,
    pub artist_art_url: Option<String>,
    pub lyrics: String,
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Snippet {
    /// The stored color, if it is a well-formed pair.
    pub fn color_pair(&self) -> Option<ColorPair> {
        self.color.as_deref().and_then(|c| c.parse().ok())
    }

    /// Has album art to derive a color from but no usable color yet.
    pub fn needs_color(&self) -> bool {
        self.color_pair().is_none()
            && self
                .album_art_url
                .as_deref()
                .is_some_and(|u| !u.trim().is_empty())
    }

    pub fn lyric_lines(&self) -> impl Iterator<Item = &str> {
        self.lyrics.split('\n')
    }
}

/// Insert payload. `user_id` comes from the session, never from the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSnippet {
    pub user_id: String,
    pub song_title: String,
    pub artist_name: String,
    pub album_art_url: Option<String>,
    pub artist_art_url: Option<String>,
    pub lyrics: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => "Unnamed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Persisted auth session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    /// Expired, or about to within the next minute.
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires_at <= now_unix + 60
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Signed in immediately.
    SignedIn(AuthUser),
    /// Account created; email confirmation needed before a session exists.
    ConfirmationRequired(AuthUser),
}

impl SignUpOutcome {
    pub fn user(&self) -> &AuthUser {
        match self {
            SignUpOutcome::SignedIn(u) | SignUpOutcome::ConfirmationRequired(u) => u,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    Followers,
    Following,
}

impl ConnectionKind {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionKind::Followers => "followers",
            ConnectionKind::Following => "following",
        }
    }
}
