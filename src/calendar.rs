use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::{config::AppConfig, error::CalendarError, models::CalendarEvent};

/// CalendarService
///
/// Read-only access to the club calendar, which is owned and synced by the external
/// calendar provider.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Up to `limit` events ending after `from`, earliest first.
    async fn upcoming_events(
        &self,
        from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

/// CalendarState
///
/// The concrete type used to share the calendar collaborator across the application state.
pub type CalendarState = Arc<dyn CalendarService>;

// --- Google Calendar v3 ---

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    location: Option<String>,
    start: EventTime,
    end: EventTime,
}

/// Timed events carry `dateTime`, all-day events carry `date`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

impl EventTime {
    fn into_parts(self) -> (String, bool) {
        match (self.date_time, self.date) {
            (Some(date_time), _) => (date_time, false),
            (None, Some(date)) => (date, true),
            (None, None) => (String::new(), false),
        }
    }
}

impl From<GoogleEvent> for CalendarEvent {
    fn from(event: GoogleEvent) -> Self {
        let (start, all_day) = event.start.into_parts();
        let (end, _) = event.end.into_parts();
        CalendarEvent {
            id: event.id,
            summary: event.summary.unwrap_or_default(),
            start,
            end,
            location: event.location,
            all_day,
        }
    }
}

/// GoogleCalendarClient
///
/// Lists events of a public Google calendar with an API key.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: reqwest::Client,
    base_url: String,
    calendar_id: String,
    api_key: String,
}

impl GoogleCalendarClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.calendar_api_url.trim_end_matches('/').to_string(),
            calendar_id: config.calendar_id.clone(),
            api_key: config.calendar_api_key.clone(),
        }
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn upcoming_events(
        &self,
        from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| CalendarError::Transport(format!("invalid calendar API URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Transport("calendar API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);

        let time_min = from.to_rfc3339();
        let max_results = limit.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("timeMin", time_min.as_str()),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CalendarError::Status(response.status().as_u16()));
        }

        let list = response.json::<EventList>().await?;
        Ok(list.items.into_iter().map(CalendarEvent::from).collect())
    }
}

// --- Mock ---

/// MockCalendarService
///
/// Serves a fixed list of events, or fails on demand.
#[derive(Clone, Default)]
pub struct MockCalendarService {
    pub events: Vec<CalendarEvent>,
    pub should_fail: bool,
}

impl MockCalendarService {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self {
            events,
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            events: vec![],
            should_fail: true,
        }
    }
}

#[async_trait]
impl CalendarService for MockCalendarService {
    async fn upcoming_events(
        &self,
        _from: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        if self.should_fail {
            return Err(CalendarError::Status(503));
        }
        Ok(self.events.iter().take(limit as usize).cloned().collect())
    }
}
