//! Google Calendar v3 provider
//!
//! Reads `GET {base}/calendars/{calendarId}/events` with recurring events
//! expanded (`singleEvents=true`) and ordered by start time. Timed events
//! carry `dateTime`, all-day events carry `date`; both are normalized here.

use super::normalize::{normalize_bookings, RawBooking};
use super::{CalendarProvider, ProviderError};
use crate::model::BookingWindow;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("campus-live/", env!("CARGO_PKG_VERSION"));
const MAX_RESULTS: &str = "250";

/// `events.list` response body
#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Debug, Deserialize)]
struct EventItem {
    summary: Option<String>,
    status: Option<String>,
    start: EventTime,
    end: EventTime,
    organizer: Option<Organizer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organizer {
    display_name: Option<String>,
    email: Option<String>,
}

impl EventTime {
    fn into_text(self) -> Option<String> {
        self.date_time.or(self.date)
    }
}

/// Google Calendar API client
pub struct GoogleCalendarProvider {
    http_client: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
    timeout: Duration,
    offset: FixedOffset,
}

impl GoogleCalendarProvider {
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout: Duration,
        offset: FixedOffset,
    ) -> Result<Self, ProviderError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ProviderError::Transport(format!("Bad base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Transport(format!("Bad base URL '{}'", base_url)));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            access_token,
            timeout,
            offset,
        })
    }

    fn events_url(&self, calendar_id: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::Transport("Base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .push("calendars")
            .push(calendar_id)
            .push("events");
        Ok(url)
    }
}

/// Convert an `events.list` body into booking windows
fn parse_events(body: &str, offset: FixedOffset) -> Result<Vec<BookingWindow>, ProviderError> {
    let response: EventsResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;

    let mut raw = Vec::with_capacity(response.items.len());
    for item in response.items {
        if item.status.as_deref() == Some("cancelled") {
            continue;
        }

        let start = item
            .start
            .into_text()
            .ok_or_else(|| ProviderError::Decode("Event without start".to_string()))?;
        let end = item
            .end
            .into_text()
            .ok_or_else(|| ProviderError::Decode("Event without end".to_string()))?;

        raw.push(RawBooking {
            title: item.summary,
            organizer: item.organizer.and_then(|o| o.display_name.or(o.email)),
            start,
            end,
        });
    }

    normalize_bookings(raw, offset)
}

#[async_trait]
impl CalendarProvider for GoogleCalendarProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn fetch_window(
        &self,
        calendar_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingWindow>, ProviderError> {
        let url = self.events_url(calendar_id)?;
        let time_min = from.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max = to.to_rfc3339_opts(SecondsFormat::Secs, true);

        tracing::debug!(calendar_id = %calendar_id, url = %url, "Querying calendar API");

        let mut request = self.http_client.get(url).query(&[
            ("timeMin", time_min.as_str()),
            ("timeMax", time_max.as_str()),
            ("singleEvents", "true"),
            ("orderBy", "startTime"),
            ("maxResults", MAX_RESULTS),
        ]);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout)
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let windows = parse_events(&body, self.offset)?;
        tracing::debug!(calendar_id = %calendar_id, bookings = windows.len(), "Retrieved calendar snapshot");
        Ok(windows)
    }
}
