//! Calendar, freebusy and meeting-room endpoints.

use chrono::{FixedOffset, SecondsFormat, TimeZone};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::booking::types::EpochMillis;
use crate::error::{BookingError, Result};
use crate::lark::client::LarkClient;

const ROOM_PAGE_SIZE: u32 = 100;

/// Start or end of an event. `timestamp` is epoch seconds as a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeInfo {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl TimeInfo {
    /// Epoch milliseconds, if the event carries a timestamp.
    pub fn millis(&self) -> Option<EpochMillis> {
        self.timestamp
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|secs| secs * 1000)
    }
}

/// A calendar event as listed by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvent {
    pub event_id: String,
    #[serde(default)]
    pub organizer_calendar_id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub start_time: TimeInfo,
    #[serde(default)]
    pub end_time: TimeInfo,
}

/// A busy interval reported by freebusy, as RFC 3339 strings.
#[derive(Debug, Clone, Deserialize)]
pub struct BusyPeriod {
    pub start_time: String,
    pub end_time: String,
}

/// A meeting room in the platform's room inventory.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingRoom {
    pub room_id: String,
    #[serde(default)]
    pub name: String,
}

/// Event to create.
#[derive(Debug, Clone)]
pub struct NewEvent<'a> {
    pub summary: &'a str,
    pub start: EpochMillis,
    pub end: EpochMillis,
    /// IANA zone name stored with the event.
    pub timezone: &'a str,
}

#[derive(Debug, Deserialize)]
struct PrimaryCalendars {
    #[serde(default)]
    calendars: Vec<PrimaryCalendar>,
}

#[derive(Debug, Deserialize)]
struct PrimaryCalendar {
    calendar: CalendarInfo,
}

#[derive(Debug, Deserialize)]
struct CalendarInfo {
    calendar_id: String,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    event: CalendarEvent,
}

#[derive(Debug, Deserialize)]
struct FreebusyData {
    #[serde(default)]
    freebusy_list: Option<Vec<BusyPeriod>>,
}

/// Render epoch milliseconds as RFC 3339 in the given offset.
pub fn to_rfc3339(at: EpochMillis, offset: &FixedOffset) -> Result<String> {
    offset
        .timestamp_millis_opt(at)
        .single()
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, false))
        .ok_or_else(|| BookingError::Record(format!("timestamp {at} out of range")))
}

/// Human-readable local time for log lines.
pub fn display_time(at: EpochMillis, offset: &FixedOffset) -> String {
    offset
        .timestamp_millis_opt(at)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| at.to_string())
}

fn epoch_secs(at: EpochMillis) -> String {
    at.div_euclid(1000).to_string()
}

fn events_path(calendar_id: &str) -> String {
    format!("/open-apis/calendar/v4/calendars/{calendar_id}/events")
}

fn attendees_path(calendar_id: &str, event_id: &str) -> String {
    format!("{}/{event_id}/attendees", events_path(calendar_id))
}

impl LarkClient {
    /// Id of the app's primary calendar, which owns the booked events.
    pub async fn primary_calendar_id(&self) -> Result<String> {
        let data: PrimaryCalendars = self
            .post(
                "get primary calendar",
                "/open-apis/calendar/v4/calendars/primary",
                &[],
                &json!({}),
            )
            .await?;
        let id = data
            .calendars
            .into_iter()
            .next()
            .map(|c| c.calendar.calendar_id)
            .ok_or_else(|| BookingError::Record("no primary calendar returned".into()))?;
        info!("primary calendar id: {id}");
        Ok(id)
    }

    /// Events of a calendar overlapping `[start, end]`.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        start: EpochMillis,
        end: EpochMillis,
    ) -> Result<Vec<CalendarEvent>> {
        let events: Vec<CalendarEvent> = self
            .get_all_pages(
                "list calendar events",
                &events_path(calendar_id),
                &[("start_time", epoch_secs(start)), ("end_time", epoch_secs(end))],
            )
            .await?;
        debug!("listed {} events", events.len());
        Ok(events)
    }

    /// Create an event and return its id.
    pub async fn create_event(&self, calendar_id: &str, event: &NewEvent<'_>) -> Result<String> {
        let body = json!({
            "summary": event.summary,
            "start_time": { "timestamp": epoch_secs(event.start), "timezone": event.timezone },
            "end_time": { "timestamp": epoch_secs(event.end), "timezone": event.timezone },
            "visibility": "default",
            "attendee_ability": "can_modify_event",
            "free_busy_status": "busy",
        });
        let created: CreatedEvent = self
            .post(
                "create calendar event",
                &events_path(calendar_id),
                &[],
                &body,
            )
            .await?;
        Ok(created.event.event_id)
    }

    /// Invite a user (open id) as an optional, notified attendee.
    pub async fn add_user_attendee(
        &self,
        calendar_id: &str,
        event_id: &str,
        user_id: &str,
    ) -> Result<()> {
        let body = json!({
            "attendees": [{ "type": "user", "is_optional": true, "user_id": user_id }],
            "need_notification": true,
        });
        self.post_unit(
            "add calendar event attendee",
            &attendees_path(calendar_id, event_id),
            &[("user_id_type", "open_id".to_owned())],
            &body,
        )
        .await
    }

    /// Add a meeting room to an event as a resource attendee.
    pub async fn add_room_attendee(
        &self,
        calendar_id: &str,
        event_id: &str,
        room_id: &str,
        approval_reason: &str,
    ) -> Result<()> {
        let body = json!({
            "attendees": [{
                "type": "resource",
                "room_id": room_id,
                "approval_reason": approval_reason,
            }],
        });
        self.post_unit(
            "add calendar event room",
            &attendees_path(calendar_id, event_id),
            &[("user_id_type", "open_id".to_owned())],
            &body,
        )
        .await
    }

    /// Busy periods of a room between two instants.
    pub async fn room_busy_periods(
        &self,
        room_id: &str,
        start: EpochMillis,
        end: EpochMillis,
        offset: &FixedOffset,
    ) -> Result<Vec<BusyPeriod>> {
        let body = json!({
            "time_min": to_rfc3339(start, offset)?,
            "time_max": to_rfc3339(end, offset)?,
            "room_id": room_id,
            "only_busy": true,
        });
        let data: FreebusyData = self
            .post(
                "list room freebusy",
                "/open-apis/calendar/v4/freebusy/list",
                &[("user_id_type", "open_id".to_owned())],
                &body,
            )
            .await?;
        let periods = data.freebusy_list.unwrap_or_default();
        debug!(
            "room {room_id} has {} busy periods between {} and {}",
            periods.len(),
            display_time(start, offset),
            display_time(end, offset)
        );
        Ok(periods)
    }

    /// Every meeting room under a room level (building or floor).
    pub async fn list_rooms(&self, room_level_id: &str) -> Result<Vec<MeetingRoom>> {
        self.get_all_pages(
            "list meeting rooms",
            "/open-apis/vc/v1/rooms",
            &[
                ("page_size", ROOM_PAGE_SIZE.to_string()),
                ("room_level_id", room_level_id.to_owned()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn cst() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn rfc3339_uses_configured_offset() {
        // 2025-07-24 11:00:00 UTC
        assert_eq!(
            to_rfc3339(1_753_354_800_000, &cst()).unwrap(),
            "2025-07-24T19:00:00+08:00"
        );
    }

    #[test]
    fn display_time_is_local() {
        assert_eq!(display_time(1_753_354_800_000, &cst()), "2025-07-24 19:00:00");
    }

    #[test]
    fn epoch_secs_truncates_millis() {
        assert_eq!(epoch_secs(1_753_354_800_999), "1753354800");
    }

    #[test]
    fn time_info_parses_seconds() {
        let info = TimeInfo {
            timestamp: Some("1753354800".into()),
            timezone: None,
        };
        assert_eq!(info.millis(), Some(1_753_354_800_000));
        assert_eq!(TimeInfo::default().millis(), None);
    }
}
