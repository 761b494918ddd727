//! Table layouts and listing options for tracked rows.
//!
//! Both tables share one column shape: id, two names, first release date, two
//! milestone columns, two image URLs and the status code. Only the column
//! names differ per kind.

use crate::model::{MediaKind, Milestones, TrackedRecord};

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub table: &'static str,
    pub columns: [&'static str; 9],
}

const SHOWS: TableSpec = TableSpec {
    table: "tracked_shows",
    columns: [
        "external_id",
        "name",
        "original_name",
        "first_air_date",
        "next_episode_date",
        "next_episode",
        "poster_url",
        "backdrop_url",
        "status",
    ],
};

const MOVIES: TableSpec = TableSpec {
    table: "tracked_movies",
    columns: [
        "external_id",
        "title",
        "original_title",
        "release_date",
        "theatrical_date",
        "digital_physical_date",
        "poster_url",
        "backdrop_url",
        "status",
    ],
};

pub fn table_spec(kind: MediaKind) -> TableSpec {
    match kind {
        MediaKind::Tv => SHOWS,
        MediaKind::Movie => MOVIES,
    }
}

impl TableSpec {
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }
}

/// The two kind-specific milestone values of a record, in column order.
pub fn milestone_values(record: &TrackedRecord) -> (&str, &str) {
    match &record.milestones {
        Milestones::Tv {
            next_episode_date,
            next_episode,
        } => (next_episode_date.as_str(), next_episode.as_str()),
        Milestones::Movie {
            theatrical_date,
            digital_physical_date,
        } => (theatrical_date.as_str(), digital_physical_date.as_str()),
    }
}

pub fn milestones_from(kind: MediaKind, first: String, second: String) -> Milestones {
    match kind {
        MediaKind::Tv => Milestones::Tv {
            next_episode_date: first,
            next_episode: second,
        },
        MediaKind::Movie => Milestones::Movie {
            theatrical_date: first,
            digital_physical_date: second,
        },
    }
}

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OrderColumn {
    ExternalId,
    #[default]
    Name,
    FirstRelease,
    Status,
    UpdatedAt,
}

impl OrderColumn {
    pub fn column(&self, spec: &TableSpec) -> &'static str {
        match self {
            OrderColumn::ExternalId => spec.columns[0],
            OrderColumn::Name => spec.columns[1],
            OrderColumn::FirstRelease => spec.columns[3],
            OrderColumn::Status => spec.columns[8],
            OrderColumn::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOrder {
    pub column: OrderColumn,
    pub descending: bool,
}

impl ListOrder {
    pub fn clause(&self, spec: &TableSpec) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!("ORDER BY {} {}", self.column.column(spec), direction)
    }
}
