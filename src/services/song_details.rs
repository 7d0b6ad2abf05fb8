use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::SongDetail;

const RELEASE_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d.%m.%Y"];

/// Source of release date, lyrics and link for a group/song pair.
#[async_trait]
pub trait SongDetailsSource: Send + Sync {
    async fn fetch(&self, group: &str, song: &str) -> Result<SongDetail>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SongDetailResponse {
    #[serde(rename = "releaseDate")]
    release_date: String,
    text: String,
    link: String,
}

impl TryFrom<SongDetailResponse> for SongDetail {
    type Error = AppError;

    fn try_from(response: SongDetailResponse) -> Result<Self> {
        Ok(SongDetail {
            release_date: parse_release_date(&response.release_date)?,
            text: response.text,
            link: response.link,
        })
    }
}

fn parse_release_date(raw: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    RELEASE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .map(Some)
        .ok_or_else(|| AppError::Enrichment(format!("unrecognized release date {raw:?}")))
}

pub struct SongDetailsClient {
    client: Client,
    base_url: String,
}

impl SongDetailsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("music-library/1.0")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SongDetailsSource for SongDetailsClient {
    async fn fetch(&self, group: &str, song: &str) -> Result<SongDetail> {
        let response = self
            .client
            .get(format!("{}/info", self.base_url))
            .query(&[("group", group), ("song", song)])
            .send()
            .await
            .map_err(|e| AppError::Enrichment(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::EnrichmentStatus {
                status: status.as_u16(),
            });
        }

        let body: SongDetailResponse = response
            .json()
            .await
            .map_err(|e| AppError::Enrichment(format!("invalid response body: {e}")))?;

        tracing::debug!(group, song, "Fetched song details");
        body.try_into()
    }
}
