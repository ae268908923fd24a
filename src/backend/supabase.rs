//! Supabase adapter: GoTrue for auth, PostgREST for tables, Storage for
//! buckets. The session is persisted in the local key-value store.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::models::{AuthUser, NewSnippet, Profile, Session, SignUpOutcome, Snippet};
use super::{AuthApi, FollowTable, ObjectStore, ProfileTable, SnippetTable};
use crate::colors::ColorPair;
use crate::config::Config;
use crate::error::{check_status, AppError, AppResult};
use crate::storage::{unix_now, StorageHandle, KEY_SESSION};

const SERVICE: &str = "backend";
const SNIPPETS: &str = "lyric_snippets";
const PROFILES: &str = "profiles";
const FOLLOWS: &str = "follows";

#[derive(Debug)]
enum SessionSlot {
    Unloaded,
    Loaded(Option<Session>),
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    storage: StorageHandle,
    session: Mutex<SessionSlot>,
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    inner: Arc<Inner>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now_unix: i64) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now_unix + self.expires_in.unwrap_or(3600));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// `/signup` answers with a session when confirmation is off, else a bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

#[derive(Debug, Deserialize)]
struct ArtistArtRow {
    artist_art_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FollowerRow {
    follower_id: String,
}

#[derive(Debug, Deserialize)]
struct FollowingRow {
    following_id: String,
}

#[derive(Debug, Serialize)]
struct SnippetUpdate<'a> {
    song_title: &'a str,
    artist_name: &'a str,
    album_art_url: Option<&'a str>,
    artist_art_url: Option<&'a str>,
    lyrics: &'a str,
    color: Option<&'a str>,
}

impl SupabaseClient {
    pub fn new(cfg: &Config, storage: StorageHandle) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&cfg.backend.anon_key).context("anon key header")?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&cfg.http.user_agent).context("user agent header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(cfg.http_timeout())
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: cfg.backend.url.trim_end_matches('/').to_string(),
                anon_key: cfg.backend.anon_key.clone(),
                storage,
                session: Mutex::new(SessionSlot::Unloaded),
            }),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.inner.base_url, path)
    }

    fn rest_url(&self, table: &str, query: &str) -> String {
        format!("{}/rest/v1/{}?{}", self.inner.base_url, table, query)
    }

    /// Current session, loading it from disk on first use and refreshing it
    /// when expired. A rejected refresh signs out locally.
    async fn session(&self) -> AppResult<Option<Session>> {
        let mut slot = self.inner.session.lock().await;
        if let SessionSlot::Unloaded = *slot {
            let stored: Option<Session> = self
                .inner
                .storage
                .get_json(KEY_SESSION)
                .await
                .map_err(AppError::Storage)?;
            *slot = SessionSlot::Loaded(stored);
        }

        let current = match &*slot {
            SessionSlot::Loaded(Some(s)) => s.clone(),
            _ => return Ok(None),
        };
        if !current.is_expired(unix_now()) {
            return Ok(Some(current));
        }

        match self.refresh(&current.refresh_token).await {
            Ok(fresh) => {
                self.persist(Some(&fresh)).await?;
                *slot = SessionSlot::Loaded(Some(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(AppError::Api { status, message, .. }) => {
                tracing::warn!("session refresh rejected ({status}): {message}");
                self.persist(None).await?;
                *slot = SessionSlot::Loaded(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> AppResult<Session> {
        let response = self
            .inner
            .http
            .post(self.auth_url("token?grant_type=refresh_token"))
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = decode(check_status(SERVICE, response).await?).await?;
        Ok(token.into_session(unix_now()))
    }

    async fn persist(&self, session: Option<&Session>) -> AppResult<()> {
        let storage = &self.inner.storage;
        let result = match session {
            Some(s) => storage.set_json(KEY_SESSION, s).await,
            None => storage.remove(KEY_SESSION).await,
        };
        result.map_err(AppError::Storage)
    }

    async fn store_session(&self, session: Option<Session>) -> AppResult<()> {
        self.persist(session.as_ref()).await?;
        *self.inner.session.lock().await = SessionSlot::Loaded(session);
        Ok(())
    }

    async fn bearer(&self) -> AppResult<String> {
        Ok(match self.session().await? {
            Some(s) => s.access_token,
            None => self.inner.anon_key.clone(),
        })
    }

    async fn request(&self, method: Method, url: String) -> AppResult<reqwest::RequestBuilder> {
        let token = self.bearer().await?;
        Ok(self.inner.http.request(method, url).bearer_auth(token))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &str) -> AppResult<Vec<T>> {
        let response = self
            .request(Method::GET, self.rest_url(table, query))
            .await?
            .send()
            .await?;
        decode(check_status(SERVICE, response).await?).await
    }

    async fn count(&self, table: &str, query: &str) -> AppResult<u64> {
        let response = self
            .request(Method::HEAD, self.rest_url(table, query))
            .await?
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total);
        Ok(total.unwrap_or(0))
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        table: &str,
        query: &str,
        prefer: &str,
        body: Option<&B>,
    ) -> AppResult<()> {
        let mut req = self
            .request(method, self.rest_url(table, query))
            .await?
            .header("Prefer", prefer);
        if let Some(body) = body {
            req = req.json(body);
        }
        check_status(SERVICE, req.send().await?).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| AppError::Decode {
        service: SERVICE,
        source,
    })
}

/// PostgREST equality filter value.
fn eq(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

/// PostgREST `in` list with quoted members.
fn in_list(values: &[String]) -> String {
    let quoted = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", urlencoding::encode(&quoted))
}

/// Total from a `Content-Range` header such as `0-9/42` or `*/42`.
fn content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[async_trait]
impl AuthApi for SupabaseClient {
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<SignUpOutcome> {
        let response = self
            .inner
            .http
            .post(self.auth_url("signup"))
            .bearer_auth(&self.inner.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        match decode::<SignUpResponse>(check_status(SERVICE, response).await?).await? {
            SignUpResponse::Session(token) => {
                let session = token.into_session(unix_now());
                let user = session.user.clone();
                self.store_session(Some(session)).await?;
                Ok(SignUpOutcome::SignedIn(user))
            }
            SignUpResponse::User(user) => Ok(SignUpOutcome::ConfirmationRequired(user)),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let response = self
            .inner
            .http
            .post(self.auth_url("token?grant_type=password"))
            .bearer_auth(&self.inner.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let token: TokenResponse = decode(check_status(SERVICE, response).await?).await?;
        let session = token.into_session(unix_now());
        self.store_session(Some(session.clone())).await?;
        Ok(session)
    }

    async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let response = self
            .inner
            .http
            .post(self.auth_url("recover"))
            .bearer_auth(&self.inner.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        check_status(SERVICE, response).await?;
        Ok(())
    }

    async fn current_user(&self) -> AppResult<Option<AuthUser>> {
        Ok(self.session().await?.map(|s| s.user))
    }

    async fn sign_out(&self) -> AppResult<()> {
        let previous = self.session().await.ok().flatten();
        self.store_session(None).await?;
        if let Some(session) = previous {
            let remote = self
                .inner
                .http
                .post(self.auth_url("logout"))
                .bearer_auth(&session.access_token)
                .send()
                .await;
            if let Err(e) = remote {
                tracing::warn!("remote sign-out failed: {e}");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SnippetTable for SupabaseClient {
    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<Snippet>> {
        let query = format!("select=*&user_id={}&order=created_at.desc", eq(user_id));
        self.select(SNIPPETS, &query).await
    }

    async fn find_artist_art(&self, artist_name: &str) -> AppResult<Option<String>> {
        let query = format!(
            "select=artist_art_url&artist_name={}&artist_art_url=not.is.null&order=created_at.desc&limit=1",
            eq(artist_name)
        );
        let rows: Vec<ArtistArtRow> = self.select(SNIPPETS, &query).await?;
        Ok(rows.into_iter().find_map(|r| r.artist_art_url))
    }

    async fn insert(&self, row: &NewSnippet) -> AppResult<()> {
        self.write(Method::POST, SNIPPETS, "", "return=minimal", Some(row))
            .await
    }

    async fn update_color(&self, id: &str, color: &ColorPair) -> AppResult<()> {
        let body = json!({ "color": color.to_string() });
        let query = format!("id={}", eq(id));
        self.write(Method::PATCH, SNIPPETS, &query, "return=minimal", Some(&body))
            .await
    }

    async fn update(&self, snippet: &Snippet) -> AppResult<()> {
        let body = SnippetUpdate {
            song_title: &snippet.song_title,
            artist_name: &snippet.artist_name,
            album_art_url: snippet.album_art_url.as_deref(),
            artist_art_url: snippet.artist_art_url.as_deref(),
            lyrics: &snippet.lyrics,
            color: snippet.color.as_deref(),
        };
        let query = format!("id={}", eq(&snippet.id));
        self.write(Method::PATCH, SNIPPETS, &query, "return=minimal", Some(&body))
            .await
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let query = format!("id={}", eq(id));
        self.write::<()>(Method::DELETE, SNIPPETS, &query, "return=minimal", None)
            .await
    }

    async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        self.count(SNIPPETS, &format!("select=id&user_id={}", eq(user_id)))
            .await
    }
}

#[async_trait]
impl ProfileTable for SupabaseClient {
    async fn get(&self, id: &str) -> AppResult<Option<Profile>> {
        let query = format!("select=id,full_name,profile_image_url&id={}&limit=1", eq(id));
        let rows: Vec<Profile> = self.select(PROFILES, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_many(&self, ids: &[String]) -> AppResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("select=id,full_name,profile_image_url&id={}", in_list(ids));
        self.select(PROFILES, &query).await
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> AppResult<Vec<Profile>> {
        let pattern = format!("*{}*", query.trim());
        let query = format!(
            "select=id,full_name,profile_image_url&full_name=ilike.{}&limit={}",
            urlencoding::encode(&pattern),
            limit
        );
        self.select(PROFILES, &query).await
    }

    async fn upsert_name(&self, id: &str, full_name: &str) -> AppResult<()> {
        let body = json!({ "id": id, "full_name": full_name, "updated_at": now_rfc3339() });
        self.write(
            Method::POST,
            PROFILES,
            "",
            "resolution=merge-duplicates,return=minimal",
            Some(&body),
        )
        .await
    }

    async fn update_name(&self, id: &str, full_name: &str) -> AppResult<()> {
        let body = json!({ "full_name": full_name });
        let query = format!("id={}", eq(id));
        self.write(Method::PATCH, PROFILES, &query, "return=minimal", Some(&body))
            .await
    }

    async fn update_image_url(&self, id: &str, url: &str) -> AppResult<()> {
        let body = json!({ "profile_image_url": url });
        let query = format!("id={}", eq(id));
        self.write(Method::PATCH, PROFILES, &query, "return=minimal", Some(&body))
            .await
    }
}

#[async_trait]
impl FollowTable for SupabaseClient {
    async fn exists(&self, follower_id: &str, following_id: &str) -> AppResult<bool> {
        let query = format!(
            "select=id&follower_id={}&following_id={}&limit=1",
            eq(follower_id),
            eq(following_id)
        );
        let rows: Vec<serde_json::Value> = self.select(FOLLOWS, &query).await?;
        Ok(!rows.is_empty())
    }

    async fn insert(&self, follower_id: &str, following_id: &str) -> AppResult<()> {
        let body = json!({ "follower_id": follower_id, "following_id": following_id });
        self.write(Method::POST, FOLLOWS, "", "return=minimal", Some(&body))
            .await
    }

    async fn delete(&self, follower_id: &str, following_id: &str) -> AppResult<()> {
        let query = format!("follower_id={}&following_id={}", eq(follower_id), eq(following_id));
        self.write::<()>(Method::DELETE, FOLLOWS, &query, "return=minimal", None)
            .await
    }

    async fn count_followers(&self, user_id: &str) -> AppResult<u64> {
        self.count(FOLLOWS, &format!("select=id&following_id={}", eq(user_id)))
            .await
    }

    async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        self.count(FOLLOWS, &format!("select=id&follower_id={}", eq(user_id)))
            .await
    }

    async fn follower_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        let query = format!("select=follower_id&following_id={}", eq(user_id));
        let rows: Vec<FollowerRow> = self.select(FOLLOWS, &query).await?;
        Ok(rows.into_iter().map(|r| r.follower_id).collect())
    }

    async fn following_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        let query = format!("select=following_id&follower_id={}", eq(user_id));
        let rows: Vec<FollowingRow> = self.select(FOLLOWS, &query).await?;
        Ok(rows.into_iter().map(|r| r.following_id).collect())
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    async fn upload(
        &self,
        bucket: &str,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AppResult<()> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.inner.base_url,
            bucket,
            urlencoding::encode(name)
        );
        let response = self
            .request(Method::POST, url)
            .await?
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        check_status(SERVICE, response).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.inner.base_url,
            bucket,
            urlencoding::encode(name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_total_parses_both_forms() {
        assert_eq!(content_range_total("0-9/42"), Some(42));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("*/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn filters_are_url_encoded() {
        assert_eq!(eq("Simon & Garfunkel"), "eq.Simon%20%26%20Garfunkel");
        assert_eq!(
            in_list(&["a".to_string(), "b".to_string()]),
            format!("in.({})", urlencoding::encode("\"a\",\"b\""))
        );
    }

    #[test]
    fn signup_response_distinguishes_session_from_bare_user() {
        let with_session = r#"{"access_token":"t","refresh_token":"r","expires_in":3600,
            "user":{"id":"u1","email":"a@b.c"}}"#;
        let bare = r#"{"id":"u2","email":"d@e.f","confirmation_sent_at":"2025-01-01T00:00:00Z"}"#;
        assert!(matches!(
            serde_json::from_str::<SignUpResponse>(with_session).unwrap(),
            SignUpResponse::Session(_)
        ));
        match serde_json::from_str::<SignUpResponse>(bare).unwrap() {
            SignUpResponse::User(u) => assert_eq!(u.id, "u2"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn token_expiry_prefers_absolute_timestamp() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"t","refresh_token":"r","expires_in":3600,"expires_at":5000,
                "user":{"id":"u1"}}"#,
        )
        .unwrap();
        assert_eq!(token.into_session(100).expires_at, 5000);

        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"t","refresh_token":"r","expires_in":3600,"user":{"id":"u1"}}"#,
        )
        .unwrap();
        assert_eq!(token.into_session(100).expires_at, 3700);
    }

    #[test]
    fn public_url_points_at_public_bucket_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.backend.url = "https://demo.supabase.co/".into();
        cfg.backend.anon_key = "anon".into();
        let client =
            SupabaseClient::new(&cfg, StorageHandle::new(dir.path().join("l.sqlite3"))).unwrap();
        assert_eq!(
            client.public_url("profile-images", "u1-1700000000000.jpg"),
            "https://demo.supabase.co/storage/v1/object/public/profile-images/u1-1700000000000.jpg"
        );
    }
}
