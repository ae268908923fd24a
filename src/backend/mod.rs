//! Backend-as-a-service collaborators: auth, the relational tables, and the
//! object store. `SupabaseClient` implements all of them over REST.

pub mod models;
pub mod supabase;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::colors::ColorPair;
use crate::error::AppResult;
use models::{AuthUser, NewSnippet, Profile, Session, SignUpOutcome, Snippet};

pub use supabase::SupabaseClient;

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<SignUpOutcome>;
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session>;
    async fn request_password_reset(&self, email: &str) -> AppResult<()>;
    /// The signed-in user, or `None` when there is no usable session.
    async fn current_user(&self) -> AppResult<Option<AuthUser>>;
    async fn sign_out(&self) -> AppResult<()>;
}

#[async_trait]
pub trait SnippetTable: Send + Sync {
    /// Newest-created first.
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Snippet>>;
    /// Most recent non-null `artist_art_url` stored for exactly this artist name.
    async fn find_artist_art(&self, artist_name: &str) -> AppResult<Option<String>>;
    async fn insert(&self, row: &NewSnippet) -> AppResult<()>;
    async fn update_color(&self, id: &str, color: &ColorPair) -> AppResult<()>;
    async fn update(&self, snippet: &Snippet) -> AppResult<()>;
    async fn delete(&self, id: &str) -> AppResult<()>;
    async fn count_by_user(&self, user_id: &str) -> AppResult<u64>;
}

#[async_trait]
pub trait ProfileTable: Send + Sync {
    async fn get(&self, id: &str) -> AppResult<Option<Profile>>;
    async fn get_many(&self, ids: &[String]) -> AppResult<Vec<Profile>>;
    /// Case-insensitive substring match on `full_name`.
    async fn search_by_name(&self, query: &str, limit: usize) -> AppResult<Vec<Profile>>;
    async fn upsert_name(&self, id: &str, full_name: &str) -> AppResult<()>;
    async fn update_name(&self, id: &str, full_name: &str) -> AppResult<()>;
    async fn update_image_url(&self, id: &str, url: &str) -> AppResult<()>;
}

#[async_trait]
pub trait FollowTable: Send + Sync {
    async fn exists(&self, follower_id: &str, following_id: &str) -> AppResult<bool>;
    async fn insert(&self, follower_id: &str, following_id: &str) -> AppResult<()>;
    async fn delete(&self, follower_id: &str, following_id: &str) -> AppResult<()>;
    async fn count_followers(&self, user_id: &str) -> AppResult<u64>;
    async fn count_following(&self, user_id: &str) -> AppResult<u64>;
    async fn follower_ids(&self, user_id: &str) -> AppResult<Vec<String>>;
    async fn following_ids(&self, user_id: &str) -> AppResult<Vec<String>>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<()>;
    fn public_url(&self, bucket: &str, name: &str) -> String;
}
