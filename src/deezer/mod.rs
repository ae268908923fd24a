//! Deezer public API: song search for the search flow and artist search for
//! artist-image enrichment.

pub mod models;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{check_status, AppError, AppResult};
use models::{ArtistHit, DeezerEnvelope, RawTrack};

pub use models::SongHit;

const SERVICE: &str = "deezer";

#[async_trait]
pub trait SongSearch: Send + Sync {
    async fn search_songs(&self, query: &str, limit: usize) -> AppResult<Vec<SongHit>>;
}

#[async_trait]
pub trait ArtistSearch: Send + Sync {
    async fn search_artists(&self, name: &str, limit: usize) -> AppResult<Vec<ArtistHit>>;
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Clone)]
pub struct DeezerClient {
    inner: Arc<Inner>,
}

impl DeezerClient {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
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
                base_url: cfg.apis.deezer_base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, query: &str, limit: usize) -> AppResult<Vec<T>> {
        let url = format!(
            "{}/{}?q={}&limit={}",
            self.inner.base_url,
            path,
            urlencoding::encode(query),
            limit
        );
        let response = check_status(SERVICE, self.inner.http.get(&url).send().await?).await?;
        let body = response.text().await?;
        let envelope: DeezerEnvelope<T> = serde_json::from_str(&body)
            .map_err(|source| AppError::Decode { service: SERVICE, source })?;

        match envelope {
            DeezerEnvelope::Data { data } => Ok(data),
            DeezerEnvelope::Error { error } => Err(AppError::Api {
                service: SERVICE,
                status: 200,
                message: format!("{} ({}): {}", error.kind, error.code, error.message),
            }),
        }
    }
}

#[async_trait]
impl SongSearch for DeezerClient {
    async fn search_songs(&self, query: &str, limit: usize) -> AppResult<Vec<SongHit>> {
        let raw: Vec<RawTrack> = self.list("search", query, limit).await?;
        Ok(raw.into_iter().map(SongHit::from).collect())
    }
}

#[async_trait]
impl ArtistSearch for DeezerClient {
    async fn search_artists(&self, name: &str, limit: usize) -> AppResult<Vec<ArtistHit>> {
        self.list("search/artist", name, limit).await
    }
}
