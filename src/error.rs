use thiserror::Error;

/// Failures surfaced by the release checks and the notification dispatcher.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("no regional release information available for movie {0}")]
    UpstreamDataMissing(String),
    #[error("upstream payload for {external_id} is missing `{field}`")]
    MissingField {
        external_id: String,
        field: &'static str,
    },
    #[error("calendar did not accept the event (status {status})")]
    NotificationCreateFailed { status: u16 },
    #[error("calendar connection was dropped before it became ready")]
    CalendarNotReady,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
