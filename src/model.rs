use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date written into a milestone column when the upstream has no such release.
pub const NO_RELEASE_DATE: &str = "1970-01-01";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Tv,
    Movie,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Tv => "tv",
            MediaKind::Movie => "movie",
        }
    }

    pub fn parse_kind(s: &str) -> Option<Self> {
        match s {
            "tv" => Some(MediaKind::Tv),
            "movie" => Some(MediaKind::Movie),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaKind::parse_kind(s).ok_or_else(|| format!("unknown media kind '{s}'"))
    }
}

/// Which release of a movie a proximity check was run against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MovieMilestone {
    Theatrical,
    DigitalPhysical,
}

impl MovieMilestone {
    /// Prefix used in the raw status vocabulary.
    pub fn prefix(&self) -> &'static str {
        match self {
            MovieMilestone::Theatrical => "theatrical",
            MovieMilestone::DigitalPhysical => "digitalPhysical",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MovieMilestone::Theatrical => "Theatrical",
            MovieMilestone::DigitalPhysical => "Digital/Physical",
        }
    }
}

/// Temporal relationship between a milestone and "now".
///
/// `NotClose` keeps the raw difference, which may be negative (threshold below
/// zero) or missing (unparseable date); both encode to the unrecognized sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Ended,
    AlreadyReleased,
    Close(u64),
    NotClose(Option<i64>),
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Ended => f.write_str("ended"),
            Category::AlreadyReleased => f.write_str("already-released"),
            Category::Close(d) => write!(f, "close,{d}"),
            Category::NotClose(Some(d)) => write!(f, "none,{d}"),
            Category::NotClose(None) => f.write_str("none,NaN"),
        }
    }
}

/// Raw status string for a movie milestone, e.g. `theatrical-close,3`.
pub fn movie_raw_status(milestone: MovieMilestone, category: Category) -> String {
    format!("{}-{}", milestone.prefix(), category)
}

/// Result of one proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityResult {
    /// `None` when either date failed to parse.
    pub difference_days: Option<i64>,
    pub is_close: bool,
}

/// Kind-specific columns of a tracked row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Milestones {
    Tv {
        next_episode_date: String,
        /// `SxxEyy`, empty when the show has ended.
        next_episode: String,
    },
    Movie {
        theatrical_date: String,
        digital_physical_date: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackedRecord {
    pub external_id: String,
    pub name: String,
    pub original_name: String,
    pub first_release_date: String,
    pub milestones: Milestones,
    pub poster_url: String,
    pub backdrop_url: String,
    pub status: i64,
}

impl TrackedRecord {
    pub fn kind(&self) -> MediaKind {
        match self.milestones {
            Milestones::Tv { .. } => MediaKind::Tv,
            Milestones::Movie { .. } => MediaKind::Movie,
        }
    }
}

/// `S01E05` style label; numbers below ten are zero padded to two digits.
pub fn episode_label(season: i64, episode: i64) -> String {
    format!("S{season:02}E{episode:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_renders_raw_vocabulary() {
        assert_eq!(Category::Ended.to_string(), "ended");
        assert_eq!(Category::AlreadyReleased.to_string(), "already-released");
        assert_eq!(Category::Close(0).to_string(), "close,0");
        assert_eq!(Category::NotClose(Some(15)).to_string(), "none,15");
        assert_eq!(Category::NotClose(None).to_string(), "none,NaN");
        assert_eq!(
            movie_raw_status(MovieMilestone::DigitalPhysical, Category::Close(3)),
            "digitalPhysical-close,3"
        );
    }

    #[test]
    fn episode_label_pads() {
        assert_eq!(episode_label(1, 5), "S01E05");
        assert_eq!(episode_label(12, 110), "S12E110");
    }

    #[test]
    fn media_kind_parses() {
        assert_eq!("tv".parse::<MediaKind>().unwrap(), MediaKind::Tv);
        assert!("show".parse::<MediaKind>().is_err());
    }
}
