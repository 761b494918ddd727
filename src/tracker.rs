//! Release checks for shows and movies.
//!
//! A check fetches metadata, classifies each milestone date against "now",
//! queues reminders for milestones that are close or already out, and returns
//! the row to persist with its encoded status.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::db::{self, Pool};
use crate::dispatch::{Dispatcher, Reminder};
use crate::error::{Result, TrackerError};
use crate::model::{
    episode_label, movie_raw_status, Category, MediaKind, Milestones, MovieMilestone,
    ProximityResult, TrackedRecord, NO_RELEASE_DATE,
};
use crate::proximity;
use crate::status;
use crate::tmdb::model::{RELEASE_TYPE_DIGITAL, RELEASE_TYPE_PHYSICAL, RELEASE_TYPE_THEATRICAL};
use crate::tmdb::{MetadataService, ReleaseDate};

/// Regions consulted for movie release dates, in order.
const RELEASE_REGIONS: &[&str] = &["US", "DE"];

/// Two-step classification: `is_close` first, then the sign of the difference.
pub fn classify(p: ProximityResult) -> Category {
    match p.difference_days {
        Some(d) if p.is_close && d < 0 => Category::AlreadyReleased,
        Some(d) if p.is_close => Category::Close(d.unsigned_abs()),
        d => Category::NotClose(d),
    }
}

/// Day a reminder for `category` should land on, if any.
fn reminder_day(category: Category, milestone: &str, today: NaiveDate) -> Option<NaiveDate> {
    match category {
        Category::AlreadyReleased => Some(today),
        Category::Close(_) => proximity::parse_instant(milestone).map(|t| t.date_naive()),
        Category::Ended | Category::NotClose(_) => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct Tracker {
    metadata: Arc<dyn MetadataService>,
    dispatcher: Option<Dispatcher>,
}

impl Tracker {
    pub fn new(metadata: Arc<dyn MetadataService>, dispatcher: Option<Dispatcher>) -> Self {
        Self {
            metadata,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> Option<&Dispatcher> {
        self.dispatcher.as_ref()
    }

    fn remind(&self, title: String, description: &str, date: NaiveDate) {
        match &self.dispatcher {
            Some(d) => d.notify(
                Reminder {
                    title,
                    description: description.to_string(),
                    date,
                },
                true,
            ),
            None => info!(%title, %date, "notifications disabled; skipping reminder"),
        }
    }

    pub async fn check(
        &self,
        kind: MediaKind,
        external_id: &str,
        threshold_days: i64,
    ) -> Result<TrackedRecord> {
        match kind {
            MediaKind::Tv => self.check_tv(external_id, threshold_days).await,
            MediaKind::Movie => self.check_movie(external_id, threshold_days).await,
        }
    }

    pub async fn check_tv(&self, external_id: &str, threshold_days: i64) -> Result<TrackedRecord> {
        self.check_tv_at(external_id, threshold_days, Utc::now()).await
    }

    pub async fn check_movie(
        &self,
        external_id: &str,
        threshold_days: i64,
    ) -> Result<TrackedRecord> {
        self.check_movie_at(external_id, threshold_days, Utc::now()).await
    }

    #[instrument(skip(self, now))]
    pub async fn check_tv_at(
        &self,
        external_id: &str,
        threshold_days: i64,
        now: DateTime<Utc>,
    ) -> Result<TrackedRecord> {
        let show = self.metadata.show_details(external_id).await?;

        let (category, next_episode_date, next_episode) = if !show.in_production {
            (Category::Ended, String::new(), String::new())
        } else {
            let next = show
                .next_episode_to_air
                .as_ref()
                .ok_or_else(|| TrackerError::MissingField {
                    external_id: external_id.to_string(),
                    field: "next_episode_to_air",
                })?;
            let air_date = next.air_date.clone().ok_or_else(|| TrackerError::MissingField {
                external_id: external_id.to_string(),
                field: "next_episode_to_air.air_date",
            })?;
            let label = episode_label(next.season_number, next.episode_number);

            let category = classify(proximity::evaluate(now, &air_date, threshold_days));
            if let Some(day) = reminder_day(category, &air_date, now.date_naive()) {
                self.remind(
                    format!("{} {}", show.name, label),
                    show.overview.as_deref().unwrap_or_default(),
                    day,
                );
            }
            (category, air_date, label)
        };

        let status = status::encode(MediaKind::Tv, &category.to_string());
        info!(external_id, name = %show.name, %category, status, "evaluated show");

        Ok(TrackedRecord {
            external_id: external_id.to_string(),
            name: show.name,
            original_name: show.original_name,
            first_release_date: show.first_air_date.unwrap_or_default(),
            milestones: Milestones::Tv {
                next_episode_date,
                next_episode,
            },
            poster_url: self.metadata.image_url(show.poster_path.as_deref()),
            backdrop_url: self.metadata.image_url(show.backdrop_path.as_deref()),
            status,
        })
    }

    #[instrument(skip(self, now))]
    pub async fn check_movie_at(
        &self,
        external_id: &str,
        threshold_days: i64,
        now: DateTime<Utc>,
    ) -> Result<TrackedRecord> {
        let movie = self.metadata.movie_details(external_id).await?;
        let releases = self.metadata.movie_release_dates(external_id).await?;

        let dates = RELEASE_REGIONS
            .iter()
            .find_map(|region| {
                releases
                    .results
                    .iter()
                    .find(|r| r.iso_3166_1 == *region && !r.release_dates.is_empty())
            })
            .map(|r| r.release_dates.as_slice())
            .ok_or_else(|| TrackerError::UpstreamDataMissing(external_id.to_string()))?;

        let first_of = |typ: u8| dates.iter().find(|d| d.typ == typ);
        let theatrical = first_of(RELEASE_TYPE_THEATRICAL);
        let digital = first_of(RELEASE_TYPE_PHYSICAL).or_else(|| first_of(RELEASE_TYPE_DIGITAL));

        // Digital/physical runs last and overwrites the theatrical outcome.
        let mut raw_status = String::new();
        for (milestone, release) in [
            (MovieMilestone::Theatrical, theatrical),
            (MovieMilestone::DigitalPhysical, digital),
        ] {
            let Some(release) = release else { continue };
            let category = self.evaluate_movie_milestone(
                &movie.title,
                movie.overview.as_deref().unwrap_or_default(),
                milestone,
                release,
                threshold_days,
                now,
            );
            raw_status = movie_raw_status(milestone, category);
        }

        let status = status::encode(MediaKind::Movie, &raw_status);
        info!(external_id, title = %movie.title, %raw_status, status, "evaluated movie");

        let day_or_sentinel = |r: Option<&ReleaseDate>| {
            r.map_or(NO_RELEASE_DATE.to_string(), |r| r.day().to_string())
        };

        Ok(TrackedRecord {
            external_id: external_id.to_string(),
            name: movie.title,
            original_name: movie.original_title,
            first_release_date: movie.release_date.unwrap_or_default(),
            milestones: Milestones::Movie {
                theatrical_date: day_or_sentinel(theatrical),
                digital_physical_date: day_or_sentinel(digital),
            },
            poster_url: self.metadata.image_url(movie.poster_path.as_deref()),
            backdrop_url: self.metadata.image_url(movie.backdrop_path.as_deref()),
            status,
        })
    }

    fn evaluate_movie_milestone(
        &self,
        title: &str,
        overview: &str,
        milestone: MovieMilestone,
        release: &ReleaseDate,
        threshold_days: i64,
        now: DateTime<Utc>,
    ) -> Category {
        let day = release.day();
        let category = classify(proximity::evaluate(now, day, threshold_days));
        if let Some(when) = reminder_day(category, day, now.date_naive()) {
            self.remind(format!("{} ({})", title, milestone.label()), overview, when);
        }
        category
    }

    /// Re-evaluate every tracked item and overwrite its row.
    #[instrument(skip(self, pool))]
    pub async fn refresh(&self, pool: &Pool, threshold_days: i64) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();
        for kind in [MediaKind::Tv, MediaKind::Movie] {
            let tracked = db::list(pool, kind, db::ListOrder::default()).await?;
            for row in tracked {
                match self.check(kind, &row.external_id, threshold_days).await {
                    Ok(record) => {
                        db::upsert(pool, std::slice::from_ref(&record)).await?;
                        summary.refreshed += 1;
                    }
                    Err(err) => {
                        warn!(
                            %kind,
                            external_id = %row.external_id,
                            %err,
                            "refresh failed; keeping previous row"
                        );
                        summary.failed += 1;
                    }
                }
            }
        }
        info!(refreshed = summary.refreshed, failed = summary.failed, "refresh complete");
        Ok(summary)
    }
}
