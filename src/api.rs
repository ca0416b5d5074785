//! Client for the Podcast Tracker HTTP API.
//!
//! [`EpisodeService`] is the seam the controller talks to; [`ApiClient`] is
//! the `reqwest` implementation used at runtime. Requests are one-shot: a
//! failure is reported to the caller and never retried here.

use crate::error::{AppError, Result};
use crate::types::{Episode, Id, ListQuery, ListResult, Podcast, RefreshResponse};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;
use std::time::Duration;

const USER_AGENT: &str = concat!("podcast-tracker/", env!("CARGO_PKG_VERSION"));

/// Remote operations the episode list depends on.
#[async_trait]
pub trait EpisodeService: Send + Sync {
    /// `GET /api/podcasts`
    async fn fetch_podcasts(&self) -> Result<Vec<Podcast>>;

    /// `GET /api/episodes?page=&page_size=&podcast_id=`
    async fn fetch_episodes(&self, query: &ListQuery) -> Result<ListResult>;

    /// `GET /api/episodes/{id}`
    async fn fetch_episode(&self, id: &Id) -> Result<Episode>;

    /// `PATCH /api/episodes/{id}/listened`. Success is the HTTP status alone.
    async fn mark_listened(&self, id: &Id) -> Result<()>;

    /// `POST /api/podcasts/refresh`
    async fn refresh_podcasts(&self) -> Result<RefreshResponse>;
}

/// HTTP implementation of [`EpisodeService`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the server at `base_url` (e.g. `http://localhost:8000`).
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidInput`] when the URL is not http(s) and
    /// [`AppError::Network`] when the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Self::with_client(base_url, http)
    }

    /// Wrap an already configured `reqwest` client.
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(AppError::InvalidInput(format!(
                "server URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }
        Ok(Self {
            http,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl EpisodeService for ApiClient {
    async fn fetch_podcasts(&self) -> Result<Vec<Podcast>> {
        let url = self.url("/api/podcasts");
        debug!("GET {}", url);

        let podcasts: Vec<Podcast> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Fetched {} podcasts", podcasts.len());
        Ok(podcasts)
    }

    async fn fetch_episodes(&self, query: &ListQuery) -> Result<ListResult> {
        let url = self.url("/api/episodes");
        debug!("GET {} {:?}", url, query);

        let result: ListResult = self
            .http
            .get(&url)
            .query(&query.to_pairs())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            "Fetched page {}/{} with {} episodes ({} total)",
            result.page,
            result.total_pages,
            result.episodes.len(),
            result.total
        );
        Ok(result)
    }

    async fn fetch_episode(&self, id: &Id) -> Result<Episode> {
        let url = self.url(&format!("/api/episodes/{}", id));
        debug!("GET {}", url);

        let episode = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(episode)
    }

    async fn mark_listened(&self, id: &Id) -> Result<()> {
        let url = self.url(&format!("/api/episodes/{}/listened", id));
        debug!("PATCH {}", url);

        self.http
            .patch(&url)
            .json(&json!({ "listened": true }))
            .send()
            .await?
            .error_for_status()?;

        info!("Episode {} marked as listened", id);
        Ok(())
    }

    async fn refresh_podcasts(&self) -> Result<RefreshResponse> {
        let url = self.url("/api/podcasts/refresh");
        debug!("POST {}", url);

        let response: RefreshResponse = self
            .http
            .post(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(count) = response.new_episodes {
            info!("Refresh reported {} new episodes", count);
        }
        Ok(response)
    }
}
