//! iCalendar text for reminder events and the duplicate check over it.

use chrono::{DateTime, NaiveDate, Utc};

/// `DTSTART;VALUE=DATE:20240105` style token.
pub fn date_token(property: &str, date: NaiveDate) -> String {
    format!("{property};VALUE=DATE:{}", date.format("%Y%m%d"))
}

/// Escape TEXT values (RFC 5545 section 3.3.11).
pub fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

/// Join folded content lines back together.
fn unfold(data: &str) -> String {
    data.replace("\r\n ", "")
        .replace("\r\n\t", "")
        .replace("\n ", "")
        .replace("\n\t", "")
}

/// Split a content line into chunks of at most 75 octets (RFC 5545 section 3.1).
///
/// Continuation lines start with a single space, which counts toward the limit.
fn fold(line: &str) -> String {
    const LIMIT: usize = 75;
    let mut out = String::with_capacity(line.len() + line.len() / LIMIT * 3);
    let mut width = 0;
    for ch in line.chars() {
        if width + ch.len_utf8() > LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += ch.len_utf8();
    }
    out
}

/// An all-day reminder with a display alarm one hour before it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub stamp: DateTime<Utc>,
}

impl ReminderEvent {
    pub fn to_ics(&self) -> String {
        let lines = [
            "BEGIN:VCALENDAR".to_string(),
            "VERSION:2.0".to_string(),
            "PRODID:-//release-watch//EN".to_string(),
            "BEGIN:VEVENT".to_string(),
            format!("UID:{}", self.uid),
            format!("DTSTAMP:{}", self.stamp.format("%Y%m%dT%H%M%SZ")),
            format!("SUMMARY:{}", escape_text(&self.summary)),
            format!("DESCRIPTION:{}", escape_text(&self.description)),
            date_token("DTSTART", self.start),
            date_token("DTEND", self.end),
            "BEGIN:VALARM".to_string(),
            "ACTION:DISPLAY".to_string(),
            format!("DESCRIPTION:{}", escape_text(&self.summary)),
            "TRIGGER:-PT1H".to_string(),
            "END:VALARM".to_string(),
            "END:VEVENT".to_string(),
            "END:VCALENDAR".to_string(),
        ];
        let mut out = String::new();
        for line in &lines {
            out.push_str(&fold(line));
            out.push_str("\r\n");
        }
        out
    }
}

/// Whether stored calendar data already holds an event for this title and day span.
pub fn matches_event(data: &str, title: &str, start: NaiveDate, end: NaiveDate) -> bool {
    let data = unfold(data);
    let has_title = data.contains(title) || data.contains(&escape_text(title));
    has_title
        && data.contains(&date_token("DTSTART", start))
        && data.contains(&date_token("DTEND", end))
}
