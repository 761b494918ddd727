//! Calendar reminder dispatch.
//!
//! A [`Dispatcher`] owns the calendar handle and publishes it through a watch
//! channel once account discovery has finished. Reminders are queued as
//! background tasks that wait for that signal, so callers never block on the
//! calendar. Each task kicks off a resync, checks the objects currently known
//! for a matching event, and creates one only if none is found.

use chrono::{Days, NaiveDate, Utc};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::calendar::{select_calendar, CalendarHandle, CalendarObject, CalendarService, NewEvent};
use crate::error::{Result, TrackerError};
use crate::ics::{matches_event, ReminderEvent};

/// Connection state of the calendar handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready(CalendarHandle),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { uid: String, url: String },
    AlreadyScheduled,
}

struct Inner {
    calendar: Arc<dyn CalendarService>,
    state: watch::Sender<Readiness>,
    create_lock: Mutex<()>,
    tasks: StdMutex<JoinSet<()>>,
    grace: Duration,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// A dispatcher with no calendar yet; see [`Dispatcher::attach`].
    pub fn new(calendar: Arc<dyn CalendarService>, grace: Duration) -> Self {
        let (state, _) = watch::channel(Readiness::Pending);
        Self {
            inner: Arc::new(Inner {
                calendar,
                state,
                create_lock: Mutex::new(()),
                tasks: StdMutex::new(JoinSet::new()),
                grace,
            }),
        }
    }

    /// Start account discovery in the background and return immediately.
    pub fn connect(
        calendar: Arc<dyn CalendarService>,
        name: Option<String>,
        grace: Duration,
    ) -> Self {
        let dispatcher = Self::new(calendar, grace);
        let this = dispatcher.clone();
        dispatcher.spawn(async move {
            let readiness = match this.discover(name.as_deref()).await {
                Ok(handle) => {
                    info!(calendar = %handle.url, events = handle.objects.len(), "calendar ready");
                    Readiness::Ready(handle)
                }
                Err(err) => {
                    error!(?err, "calendar discovery failed");
                    Readiness::Failed(err.to_string())
                }
            };
            this.inner.state.send_replace(readiness);
        });
        dispatcher
    }

    async fn discover(&self, name: Option<&str>) -> anyhow::Result<CalendarHandle> {
        let calendars = self.inner.calendar.list_calendars().await?;
        let handle = select_calendar(calendars, name)
            .ok_or_else(|| anyhow::anyhow!("no calendar named {:?} on the server", name))?;
        self.inner.calendar.sync_calendar(&handle).await
    }

    /// Install a known handle and mark the dispatcher ready.
    pub fn attach(&self, handle: CalendarHandle) {
        self.inner.state.send_replace(Readiness::Ready(handle));
    }

    /// Snapshot of the handle as currently known.
    pub fn current(&self) -> Option<CalendarHandle> {
        match &*self.inner.state.borrow() {
            Readiness::Ready(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    fn spawn<F>(&self, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while let Some(finished) = tasks.try_join_next() {
            if let Err(err) = finished {
                warn!(%err, "dispatch task aborted");
            }
        }
        tasks.spawn(fut);
    }

    /// Queue a reminder without waiting for it.
    pub fn notify(&self, reminder: Reminder, expedited: bool) {
        let this = self.clone();
        self.spawn(async move {
            let title = reminder.title.clone();
            let date = reminder.date;
            match this.dispatch(reminder, expedited).await {
                Ok(Outcome::Created { uid, .. }) => info!(%title, %date, %uid, "reminder created"),
                Ok(Outcome::AlreadyScheduled) => {
                    debug!(%title, %date, "reminder already scheduled")
                }
                Err(err) => error!(%title, %date, %err, "failed to schedule reminder"),
            }
        });
    }

    /// Wait for every queued reminder and resync to finish.
    pub async fn wait_idle(&self) {
        loop {
            let mut tasks = {
                let mut guard = self
                    .inner
                    .tasks
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                std::mem::take(&mut *guard)
            };
            if tasks.is_empty() {
                return;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    warn!(%err, "dispatch task aborted");
                }
            }
        }
    }

    async fn ready_handle(&self) -> Result<()> {
        let mut rx = self.inner.state.subscribe();
        let ready = {
            let state = rx
                .wait_for(|s| !matches!(s, Readiness::Pending))
                .await
                .map_err(|_| TrackerError::CalendarNotReady)?;
            matches!(&*state, Readiness::Ready(_))
        };
        if ready {
            Ok(())
        } else {
            Err(TrackerError::CalendarNotReady)
        }
    }

    /// Schedule a reminder and wait for the outcome.
    #[instrument(skip_all, fields(title = %reminder.title, date = %reminder.date))]
    pub async fn dispatch(&self, reminder: Reminder, expedited: bool) -> Result<Outcome> {
        self.ready_handle().await?;
        if expedited && !self.inner.grace.is_zero() {
            tokio::time::sleep(self.inner.grace).await;
        }

        let _guard = self.inner.create_lock.lock().await;
        let handle = self.current().ok_or(TrackerError::CalendarNotReady)?;
        self.resync(handle.clone());

        let start = reminder.date;
        let end = start.checked_add_days(Days::new(1)).unwrap_or(start);
        if handle
            .objects
            .iter()
            .any(|o| matches_event(&o.data, &reminder.title, start, end))
        {
            return Ok(Outcome::AlreadyScheduled);
        }

        let uid = Uuid::new_v4().to_string();
        let event = ReminderEvent {
            uid: uid.clone(),
            summary: reminder.title,
            description: reminder.description,
            start,
            end,
            stamp: Utc::now(),
        };
        let new_event = NewEvent {
            data: event.to_ics(),
            filename: format!("{uid}.ics"),
        };
        let response = self.inner.calendar.create_event(&handle, &new_event).await?;
        if !response.ok {
            return Err(TrackerError::NotificationCreateFailed {
                status: response.status,
            });
        }

        let created = CalendarObject {
            url: response.url.clone(),
            etag: None,
            data: new_event.data,
        };
        self.inner.state.send_modify(|state| {
            if let Readiness::Ready(h) = state {
                h.objects.push(created);
            }
        });
        Ok(Outcome::Created {
            uid,
            url: response.url,
        })
    }

    fn resync(&self, handle: CalendarHandle) {
        let this = self.clone();
        self.spawn(async move {
            match this.inner.calendar.sync_calendar(&handle).await {
                Ok(synced) => this.inner.state.send_modify(|state| {
                    if let Readiness::Ready(current) = state {
                        merge_synced(current, synced);
                    }
                }),
                Err(err) => warn!(?err, calendar = %handle.url, "calendar resync failed"),
            }
        });
    }
}

/// Take the server's view, keeping objects created locally that it does not list yet.
fn merge_synced(current: &mut CalendarHandle, synced: CalendarHandle) {
    let pending: Vec<CalendarObject> = current
        .objects
        .drain(..)
        .filter(|local| {
            local.etag.is_none() && !synced.objects.iter().any(|o| o.url == local.url)
        })
        .collect();
    current.ctag = synced.ctag;
    current.objects = synced.objects;
    current.objects.extend(pending);
}
