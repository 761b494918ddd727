use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

use crate::config::Config;
use crate::model::MediaKind;

pub mod model;

pub use model::{
    EpisodeRef, MediaSummary, MovieDetails, Page, RegionReleases, ReleaseDate, ReleaseDatesResp,
    ShowDetails,
};

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3/";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/";

/// Read side of the metadata service used by the release checks.
#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn show_details(&self, id: &str) -> Result<ShowDetails>;

    async fn movie_details(&self, id: &str) -> Result<MovieDetails>;

    async fn movie_release_dates(&self, id: &str) -> Result<ReleaseDatesResp>;

    /// Absolute image URL for a poster/backdrop path; empty when there is none.
    fn image_url(&self, path: Option<&str>) -> String;
}

#[derive(Clone)]
pub struct TmdbClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    language: String,
    image_width: u32,
}

impl fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl TmdbClient {
    pub fn new(api_key: String, language: String, image_width: u32) -> Self {
        let base_url = Url::parse(TMDB_API_BASE).expect("valid default TMDB URL");
        Self::with_base_url(api_key, language, image_width, base_url)
    }

    pub fn with_base_url(
        api_key: String,
        language: String,
        image_width: u32,
        base_url: Url,
    ) -> Self {
        let http = Client::builder()
            .user_agent("release-watch/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            api_key: SecretString::from(api_key),
            language,
            image_width,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = match &cfg.tmdb.base_url {
            Some(raw) => Url::parse(raw).context("invalid tmdb.base_url")?,
            None => Url::parse(TMDB_API_BASE)?,
        };
        Ok(Self::with_base_url(
            cfg.tmdb.api_key.clone(),
            cfg.tmdb.language.clone(),
            cfg.tmdb.image_width,
            base_url,
        ))
    }

    pub fn build_request(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid TMDB path {path}"))?;
        self.http
            .get(endpoint)
            .query(&[
                ("api_key", self.api_key.expose_secret()),
                ("language", self.language.as_str()),
            ])
            .query(query)
            .header("Accept", "application/json")
            .build()
            .context("failed to build TMDB request")
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.build_request(path, query)?;
        debug!(path, "sending tmdb request");
        let res = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("failed to reach TMDB for {path}"))?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("received 429 from TMDB: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("tmdb error {} on {}: {}", status, path, body));
        }

        res.json::<T>()
            .await
            .with_context(|| format!("unexpected TMDB payload for {path}"))
    }

    pub async fn show_details(&self, id: &str) -> Result<ShowDetails> {
        self.get_json(&format!("tv/{id}"), &[]).await
    }

    pub async fn movie_details(&self, id: &str) -> Result<MovieDetails> {
        self.get_json(&format!("movie/{id}"), &[]).await
    }

    pub async fn movie_release_dates(&self, id: &str) -> Result<ReleaseDatesResp> {
        self.get_json(&format!("movie/{id}/release_dates"), &[]).await
    }

    pub async fn search(
        &self,
        kind: MediaKind,
        query: &str,
        page: u32,
    ) -> Result<Page<MediaSummary>> {
        self.get_json(
            &format!("search/{}", kind.as_str()),
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    pub async fn shows_on_the_air(&self) -> Result<Page<MediaSummary>> {
        self.get_json("tv/on_the_air", &[]).await
    }

    pub async fn shows_airing_today(&self) -> Result<Page<MediaSummary>> {
        self.get_json("tv/airing_today", &[]).await
    }

    pub async fn upcoming_movies(&self) -> Result<Page<MediaSummary>> {
        self.get_json("movie/upcoming", &[]).await
    }
}

/// `https://image.tmdb.org/t/p/w<width><path>`, or empty without a path.
pub fn image_url(path: Option<&str>, width: u32) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{TMDB_IMAGE_BASE}w{width}{p}"),
        None => String::new(),
    }
}

#[async_trait]
impl MetadataService for TmdbClient {
    async fn show_details(&self, id: &str) -> Result<ShowDetails> {
        TmdbClient::show_details(self, id).await
    }

    async fn movie_details(&self, id: &str) -> Result<MovieDetails> {
        TmdbClient::movie_details(self, id).await
    }

    async fn movie_release_dates(&self, id: &str) -> Result<ReleaseDatesResp> {
        TmdbClient::movie_release_dates(self, id).await
    }

    fn image_url(&self, path: Option<&str>) -> String {
        image_url(path, self.image_width)
    }
}
