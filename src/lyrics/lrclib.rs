//! LRCLIB API client
//!
//! LRCLIB is a free lyrics API. Only its search endpoint is used, in two
//! flavours: structured (track + artist fields) and broad (free text).
//! API Documentation: https://lrclib.net/docs

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::LyricsSource;
use crate::config::Config;
use crate::error::{check_status, AppError, AppResult};

const SERVICE: &str = "lrclib";

/// One LRCLIB search result.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LrclibRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub track_name: String,
    #[serde(default)]
    pub artist_name: String,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
}

impl LrclibRecord {
    fn plain(&self) -> Option<&str> {
        self.plain_lyrics.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// First entry with non-blank plain lyrics, else whatever the first entry has.
pub fn pick_plain_lyrics(records: &[LrclibRecord]) -> Option<String> {
    records
        .iter()
        .find_map(LrclibRecord::plain)
        .or_else(|| records.first().and_then(LrclibRecord::plain))
        .map(str::to_string)
}

/// LRCLIB API client
#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent(cfg.http.user_agent.as_str())
                .timeout(cfg.http_timeout())
                .build()
                .context("build reqwest client")?,
            base_url: cfg.apis.lrclib_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn search(&self, query: &str) -> AppResult<Vec<LrclibRecord>> {
        let url = format!("{}/search?{}", self.base_url, query);
        let response = check_status(SERVICE, self.client.get(&url).send().await?).await?;
        let body = response.text().await?;
        let records: Vec<LrclibRecord> =
            serde_json::from_str(&body).map_err(|source| AppError::Decode {
                service: SERVICE,
                source,
            })?;
        if let Some(top) = records.first() {
            tracing::debug!(
                "lrclib {query}: {} hits, top #{} {:?} by {:?}",
                records.len(),
                top.id,
                top.track_name,
                top.artist_name
            );
        }
        Ok(records)
    }
}

#[async_trait]
impl LyricsSource for LrclibClient {
    async fn search_structured(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> AppResult<Vec<LrclibRecord>> {
        self.search(&format!(
            "track_name={}&artist_name={}",
            urlencoding::encode(track_name),
            urlencoding::encode(artist_name)
        ))
        .await
    }

    async fn search_broad(&self, query: &str) -> AppResult<Vec<LrclibRecord>> {
        self.search(&format!("q={}", urlencoding::encode(query))).await
    }
}
