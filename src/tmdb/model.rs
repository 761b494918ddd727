use serde::Deserialize;

/// Release-date type codes as published by the metadata service.
pub const RELEASE_TYPE_THEATRICAL: u8 = 3;
pub const RELEASE_TYPE_DIGITAL: u8 = 4;
pub const RELEASE_TYPE_PHYSICAL: u8 = 5;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ShowDetails {
    pub id: i64,
    pub name: String,
    pub original_name: String,
    #[serde(default)]
    pub first_air_date: Option<String>,
    pub in_production: bool,
    #[serde(default)]
    pub next_episode_to_air: Option<EpisodeRef>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct EpisodeRef {
    #[serde(default)]
    pub air_date: Option<String>,
    pub season_number: i64,
    pub episode_number: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MovieDetails {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ReleaseDatesResp {
    pub id: i64,
    pub results: Vec<RegionReleases>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RegionReleases {
    pub iso_3166_1: String,
    pub release_dates: Vec<ReleaseDate>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ReleaseDate {
    /// ISO timestamp, e.g. `2024-05-01T00:00:00.000Z`.
    pub release_date: String,
    #[serde(rename = "type")]
    pub typ: u8,
    #[serde(default)]
    pub certification: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ReleaseDate {
    /// The `YYYY-MM-DD` part of the timestamp.
    pub fn day(&self) -> &str {
        self.release_date
            .get(..10)
            .unwrap_or(self.release_date.as_str())
    }
}

/// One page of a listing or search endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// Listing entry for either kind; tv entries use `name`/`first_air_date`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MediaSummary {
    pub id: i64,
    #[serde(alias = "name")]
    pub title: Option<String>,
    #[serde(alias = "first_air_date", default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}
