use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, IF_NONE_MATCH};
use reqwest::{Client, Method, Url};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tracing::{debug, info};

use crate::config::Config;

pub mod multistatus;

/// One stored calendar resource (an `.ics` file on the server).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalendarObject {
    pub url: String,
    pub etag: Option<String>,
    pub data: String,
}

/// A calendar plus the objects known from its last sync.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalendarHandle {
    pub url: String,
    pub display_name: Option<String>,
    pub ctag: Option<String>,
    pub objects: Vec<CalendarObject>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// iCalendar text (`BEGIN:VCALENDAR` ... `END:VCALENDAR`).
    pub data: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResponse {
    pub ok: bool,
    pub status: u16,
    pub url: String,
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Discover the account's calendars. Returned handles carry no objects.
    async fn list_calendars(&self) -> Result<Vec<CalendarHandle>>;

    /// Fetch the current event objects of a calendar.
    async fn sync_calendar(&self, handle: &CalendarHandle) -> Result<CalendarHandle>;

    async fn create_event(
        &self,
        handle: &CalendarHandle,
        event: &NewEvent,
    ) -> Result<CreateResponse>;
}

/// Pick the calendar named `name`, or the first one.
pub fn select_calendar(
    calendars: Vec<CalendarHandle>,
    name: Option<&str>,
) -> Option<CalendarHandle> {
    match name {
        Some(name) => calendars
            .into_iter()
            .find(|c| c.display_name.as_deref() == Some(name)),
        None => calendars.into_iter().next(),
    }
}

#[derive(Clone)]
pub struct CalDavClient {
    http: Client,
    server_url: Url,
    username: String,
    password: SecretString,
}

impl fmt::Debug for CalDavClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalDavClient")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

const PROPFIND_PRINCIPAL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:current-user-principal/></d:prop></d:propfind>"#;

const PROPFIND_HOME: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop><c:calendar-home-set/></d:prop>
</d:propfind>"#;

const PROPFIND_CALENDARS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:cs="http://calendarserver.org/ns/">
  <d:prop><d:displayname/><d:resourcetype/><cs:getctag/></d:prop>
</d:propfind>"#;

const REPORT_EVENTS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop><d:getetag/><c:calendar-data/></d:prop>
  <c:filter>
    <c:comp-filter name="VCALENDAR"><c:comp-filter name="VEVENT"/></c:comp-filter>
  </c:filter>
</c:calendar-query>"#;

impl CalDavClient {
    pub fn new(server_url: Url, username: String, password: String) -> Self {
        let http = Client::builder()
            .user_agent("release-watch/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            server_url,
            username,
            password: SecretString::from(password),
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let server_url = Url::parse(&cfg.caldav.server_url).context("invalid caldav.server_url")?;
        Ok(Self::new(
            server_url,
            cfg.caldav.username.clone(),
            cfg.caldav.password.clone(),
        ))
    }

    fn method(name: &str) -> Method {
        Method::from_bytes(name.as_bytes()).expect("valid WebDAV method")
    }

    pub fn build_dav_request(
        &self,
        method: &str,
        url: Url,
        depth: u8,
        body: &str,
    ) -> Result<reqwest::Request> {
        self.http
            .request(Self::method(method), url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header("Depth", depth.to_string())
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(body.to_string())
            .build()
            .context("failed to build CalDAV request")
    }

    async fn dav(&self, method: &str, url: Url, depth: u8, body: &str) -> Result<String> {
        let request = self.build_dav_request(method, url.clone(), depth, body)?;
        debug!(%url, method, "sending caldav request");
        let res = self
            .http
            .execute(request)
            .await
            .with_context(|| format!("failed to reach CalDAV server at {url}"))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("caldav {} {} failed {}: {}", method, url, status, body));
        }
        res.text().await.context("failed to read CalDAV response")
    }

    fn resolve(&self, href: &str) -> Result<Url> {
        self.server_url
            .join(href)
            .with_context(|| format!("invalid href {href}"))
    }

    async fn principal_url(&self) -> Result<Url> {
        let body = self
            .dav("PROPFIND", self.server_url.clone(), 0, PROPFIND_PRINCIPAL)
            .await?;
        let href = multistatus::nested_href(&body, "current-user-principal")
            .ok_or_else(|| anyhow!("server did not report current-user-principal"))?;
        self.resolve(&href)
    }

    async fn home_url(&self, principal: Url) -> Result<Url> {
        let body = self.dav("PROPFIND", principal, 0, PROPFIND_HOME).await?;
        let href = multistatus::nested_href(&body, "calendar-home-set")
            .ok_or_else(|| anyhow!("server did not report calendar-home-set"))?;
        self.resolve(&href)
    }
}

/// Calendars listed in a home-set PROPFIND body.
pub fn parse_calendars(body: &str, base: &Url) -> Vec<CalendarHandle> {
    multistatus::responses(body)
        .into_iter()
        .filter(|r| multistatus::has_element(&r.body, "calendar"))
        .filter_map(|r| {
            let url = base.join(&r.href).ok()?;
            Some(CalendarHandle {
                url: url.to_string(),
                display_name: multistatus::text(&r.body, "displayname").filter(|s| !s.is_empty()),
                ctag: multistatus::text(&r.body, "getctag"),
                objects: Vec::new(),
            })
        })
        .collect()
}

/// Event objects in a calendar-query REPORT body.
pub fn parse_objects(body: &str, base: &Url) -> Vec<CalendarObject> {
    multistatus::responses(body)
        .into_iter()
        .filter_map(|r| {
            let data = multistatus::text(&r.body, "calendar-data")?;
            let url = base.join(&r.href).ok()?;
            Some(CalendarObject {
                url: url.to_string(),
                etag: multistatus::text(&r.body, "getetag"),
                data,
            })
        })
        .collect()
}

#[async_trait]
impl CalendarService for CalDavClient {
    async fn list_calendars(&self) -> Result<Vec<CalendarHandle>> {
        let principal = self.principal_url().await?;
        let home = self.home_url(principal).await?;
        let body = self
            .dav("PROPFIND", home.clone(), 1, PROPFIND_CALENDARS)
            .await?;
        let calendars = parse_calendars(&body, &home);
        info!(home = %home, count = calendars.len(), "discovered calendars");
        Ok(calendars)
    }

    async fn sync_calendar(&self, handle: &CalendarHandle) -> Result<CalendarHandle> {
        let url = Url::parse(&handle.url).context("invalid calendar URL")?;
        let body = self.dav("REPORT", url.clone(), 1, REPORT_EVENTS).await?;
        let objects = parse_objects(&body, &url);
        debug!(calendar = %handle.url, count = objects.len(), "synced calendar");
        Ok(CalendarHandle {
            objects,
            ..handle.clone()
        })
    }

    async fn create_event(
        &self,
        handle: &CalendarHandle,
        event: &NewEvent,
    ) -> Result<CreateResponse> {
        let mut base = Url::parse(&handle.url).context("invalid calendar URL")?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let url = base
            .join(&event.filename)
            .with_context(|| format!("invalid event filename {}", event.filename))?;
        let res = self
            .http
            .put(url.clone())
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(CONTENT_TYPE, "text/calendar; charset=utf-8")
            .header(IF_NONE_MATCH, "*")
            .body(event.data.clone())
            .send()
            .await
            .with_context(|| format!("failed to reach CalDAV server at {url}"))?;
        Ok(CreateResponse {
            ok: res.status().is_success(),
            status: res.status().as_u16(),
            url: url.to_string(),
        })
    }
}
