#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use release_watch::calendar::{
    CalendarHandle, CalendarObject, CalendarService, CreateResponse, NewEvent,
};
use release_watch::tmdb::{
    self, EpisodeRef, MetadataService, MovieDetails, RegionReleases, ReleaseDate,
    ReleaseDatesResp, ShowDetails,
};

pub async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn show(
    id: i64,
    name: &str,
    in_production: bool,
    next: Option<(&str, i64, i64)>,
) -> ShowDetails {
    ShowDetails {
        id,
        name: name.into(),
        original_name: format!("{name} (original)"),
        first_air_date: Some("2019-02-01".into()),
        in_production,
        next_episode_to_air: next.map(|(air_date, season, episode)| EpisodeRef {
            air_date: Some(air_date.into()),
            season_number: season,
            episode_number: episode,
            name: None,
        }),
        overview: Some(format!("{name} overview")),
        poster_path: Some("/poster.jpg".into()),
        backdrop_path: None,
    }
}

pub fn movie(id: i64, title: &str) -> MovieDetails {
    MovieDetails {
        id,
        title: title.into(),
        original_title: title.into(),
        release_date: Some("2024-03-01".into()),
        overview: Some(format!("{title} overview")),
        poster_path: Some("/m.jpg".into()),
        backdrop_path: Some("/b.jpg".into()),
    }
}

/// `(region, [(day, type)])` pairs into a release-dates payload.
pub fn releases(id: i64, regions: &[(&str, &[(&str, u8)])]) -> ReleaseDatesResp {
    ReleaseDatesResp {
        id,
        results: regions
            .iter()
            .map(|(region, dates)| RegionReleases {
                iso_3166_1: region.to_string(),
                release_dates: dates
                    .iter()
                    .map(|(day, typ)| ReleaseDate {
                        release_date: format!("{day}T00:00:00.000Z"),
                        typ: *typ,
                        certification: None,
                        note: None,
                    })
                    .collect(),
            })
            .collect(),
    }
}

#[derive(Default)]
pub struct FakeMetadata {
    pub shows: HashMap<String, ShowDetails>,
    pub movies: HashMap<String, (MovieDetails, ReleaseDatesResp)>,
}

impl FakeMetadata {
    pub fn with_show(mut self, details: ShowDetails) -> Self {
        self.shows.insert(details.id.to_string(), details);
        self
    }

    pub fn with_movie(mut self, details: MovieDetails, dates: ReleaseDatesResp) -> Self {
        self.movies.insert(details.id.to_string(), (details, dates));
        self
    }
}

#[async_trait]
impl MetadataService for FakeMetadata {
    async fn show_details(&self, id: &str) -> Result<ShowDetails> {
        self.shows
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("tmdb error 404 Not Found on tv/{id}"))
    }

    async fn movie_details(&self, id: &str) -> Result<MovieDetails> {
        self.movies
            .get(id)
            .map(|(m, _)| m.clone())
            .ok_or_else(|| anyhow!("tmdb error 404 Not Found on movie/{id}"))
    }

    async fn movie_release_dates(&self, id: &str) -> Result<ReleaseDatesResp> {
        self.movies
            .get(id)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| anyhow!("tmdb error 404 Not Found on movie/{id}/release_dates"))
    }

    fn image_url(&self, path: Option<&str>) -> String {
        tmdb::image_url(path, 500)
    }
}

pub fn calendar(name: &str) -> CalendarHandle {
    CalendarHandle {
        url: format!("https://dav.example.com/cal/{}/", name.to_lowercase()),
        display_name: Some(name.into()),
        ctag: None,
        objects: Vec::new(),
    }
}

/// Calendar server double that records creations and serves them back on sync.
#[derive(Clone, Default)]
pub struct RecordingCalendar {
    pub calendars: Vec<CalendarHandle>,
    pub server_objects: Arc<Mutex<Vec<CalendarObject>>>,
    pub creates: Arc<Mutex<Vec<NewEvent>>>,
    pub syncs: Arc<Mutex<usize>>,
    /// Reply to creations with this HTTP status and `ok: false`.
    pub reject_with: Option<u16>,
    /// Leave created events out of sync results.
    pub lagging: bool,
}

impl RecordingCalendar {
    pub fn with_objects(objects: Vec<CalendarObject>) -> Self {
        Self {
            server_objects: Arc::new(Mutex::new(objects)),
            ..Default::default()
        }
    }

    pub async fn created(&self) -> Vec<NewEvent> {
        self.creates.lock().await.clone()
    }
}

#[async_trait]
impl CalendarService for RecordingCalendar {
    async fn list_calendars(&self) -> Result<Vec<CalendarHandle>> {
        Ok(self.calendars.clone())
    }

    async fn sync_calendar(&self, handle: &CalendarHandle) -> Result<CalendarHandle> {
        *self.syncs.lock().await += 1;
        Ok(CalendarHandle {
            objects: self.server_objects.lock().await.clone(),
            ..handle.clone()
        })
    }

    async fn create_event(
        &self,
        handle: &CalendarHandle,
        event: &NewEvent,
    ) -> Result<CreateResponse> {
        self.creates.lock().await.push(event.clone());
        let url = format!("{}{}", handle.url, event.filename);
        if let Some(status) = self.reject_with {
            return Ok(CreateResponse {
                ok: false,
                status,
                url,
            });
        }
        if !self.lagging {
            self.server_objects.lock().await.push(CalendarObject {
                url: url.clone(),
                etag: Some("\"server\"".into()),
                data: event.data.clone(),
            });
        }
        Ok(CreateResponse {
            ok: true,
            status: 201,
            url,
        })
    }
}
