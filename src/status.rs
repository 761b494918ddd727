//! Compact integer status codes.
//!
//! A code is a base (one or two digits naming kind, milestone and category)
//! followed, for `close`/`none`, by the day magnitude: `base * 10^len(d) + d`.
//! Every valid base is either a single digit (`0`) or two digits, so the code
//! splits back into base and magnitude by looking at its decimal rendering.

use crate::model::{Category, MediaKind, MovieMilestone};

/// Returned for any raw status outside the known vocabulary.
pub const UNRECOGNIZED: i64 = -1;

const TV_EXACT: &[(&str, i64)] = &[("ended", 0), ("already-released", 10)];
const TV_MAGNITUDE: &[(&str, i64)] = &[("close,", 20), ("none,", 30)];

const MOVIE_EXACT: &[(&str, i64)] = &[
    ("theatrical-already-released", 11),
    ("digitalPhysical-already-released", 12),
];
const MOVIE_MAGNITUDE: &[(&str, i64)] = &[
    ("theatrical-close,", 21),
    ("digitalPhysical-close,", 22),
    ("theatrical-none,", 31),
    ("digitalPhysical-none,", 32),
];

/// Encode a raw status such as `close,3` or `theatrical-none,40`.
///
/// Never fails; unmatched input gives [`UNRECOGNIZED`].
pub fn encode(kind: MediaKind, raw: &str) -> i64 {
    let (exact, magnitude) = match kind {
        MediaKind::Tv => (TV_EXACT, TV_MAGNITUDE),
        MediaKind::Movie => (MOVIE_EXACT, MOVIE_MAGNITUDE),
    };

    if let Some((_, base)) = exact.iter().find(|(pattern, _)| *pattern == raw) {
        return *base;
    }

    for (prefix, base) in magnitude {
        if let Some(rest) = raw.strip_prefix(prefix) {
            let digits = rest.split(',').next().unwrap_or_default();
            return append_magnitude(*base, digits).unwrap_or(UNRECOGNIZED);
        }
    }

    UNRECOGNIZED
}

fn append_magnitude(base: i64, digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude: i64 = digits.parse().ok()?;
    let shift = 10_i64.checked_pow(u32::try_from(digits.len()).ok()?)?;
    base.checked_mul(shift)?.checked_add(magnitude)
}

/// A status code split back into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub base: i64,
    pub magnitude: Option<u64>,
}

/// Inverse of [`encode`]. `None` for the sentinel and anything malformed.
pub fn decode(code: i64) -> Option<Decoded> {
    if code < 0 {
        return None;
    }
    let rendered = code.to_string();
    if let Ok(base) = rendered.parse::<i64>() {
        if matches!(base, 0 | 10 | 11 | 12) {
            return Some(Decoded {
                base,
                magnitude: None,
            });
        }
    }
    if rendered.len() < 3 {
        return None;
    }
    let (head, tail) = rendered.split_at(2);
    let base: i64 = head.parse().ok()?;
    if !matches!(base, 20 | 21 | 22 | 30 | 31 | 32) {
        return None;
    }
    Some(Decoded {
        base,
        magnitude: Some(tail.parse().ok()?),
    })
}

/// What a base code stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseMeaning {
    pub kind: MediaKind,
    pub milestone: Option<MovieMilestone>,
    pub category: Category,
}

/// Map a decoded code to kind, milestone and category.
pub fn describe(decoded: Decoded) -> Option<BaseMeaning> {
    let kind = match decoded.base % 10 {
        0 => MediaKind::Tv,
        _ => MediaKind::Movie,
    };
    let milestone = match decoded.base % 10 {
        1 => Some(MovieMilestone::Theatrical),
        2 => Some(MovieMilestone::DigitalPhysical),
        _ => None,
    };
    let category = match (decoded.base / 10, decoded.magnitude) {
        (0, None) => Category::Ended,
        (1, None) => Category::AlreadyReleased,
        (2, Some(d)) => Category::Close(d),
        (3, Some(d)) => Category::NotClose(i64::try_from(d).ok()),
        _ => return None,
    };
    Some(BaseMeaning {
        kind,
        milestone,
        category,
    })
}

/// Human readable rendering used by listings.
pub fn render(code: i64) -> String {
    let Some(meaning) = decode(code).and_then(describe) else {
        return "unknown".to_string();
    };
    let category = match meaning.category {
        Category::Ended => "ended".to_string(),
        Category::AlreadyReleased => "already released".to_string(),
        Category::Close(d) => format!("in {d} day(s)"),
        Category::NotClose(Some(d)) => format!("in {d} day(s), not close"),
        Category::NotClose(None) => "not close".to_string(),
    };
    match meaning.milestone {
        Some(m) => format!("{}: {}", m.label(), category),
        None => category,
    }
}
