//! Mapping between bitable rows and booking records.
//!
//! Field names are the column headers of the operator-maintained tables.
//! Cell values come in several shapes depending on the column type (plain
//! text, rich-text segments, single/multi select, person, number), so the
//! readers below accept each shape a column is known to produce.

use serde_json::{Map, Value, json};

use crate::booking::types::{CompletionRecord, EpochMillis, RecurringTaskDefinition, RoomConfig};
use crate::error::{BookingError, Result};
use crate::lark::bitable::TableRecord;
use crate::lark::calendar::MeetingRoom;

pub const TASK_ID: &str = "任务ID";
pub const TASK_STATUS: &str = "任务状态";
pub const TASK_TITLE: &str = "日程标题";
pub const TASK_START: &str = "日程开始时间";
pub const TASK_END: &str = "日程结束时间";
pub const TASK_CYCLE: &str = "循环周期";
pub const TASK_PREFERRED_ROOMS: &str = "优先预定偏好会议室";
pub const TASK_ALLOW_BACKUP: &str = "允许预定非偏好会议室";
pub const TASK_BOOKER: &str = "预订人";

pub const ROOM_ID: &str = "room_id";
pub const ROOM_NAME: &str = "room_name";
pub const ROOM_STATUS: &str = "room_status";

pub const EVENT_ID: &str = "event_id";

/// Value of a status column that enables a row.
pub const STATUS_ON: &str = "ON";

/// Text content of a cell.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // rich text: [{"type": "text", "text": "..."}]
        Value::Array(items) => {
            let joined: String = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => other.get("text").and_then(Value::as_str).map(str::to_owned),
                })
                .collect();
            (!joined.is_empty()).then_some(joined)
        }
        Value::Object(obj) => obj.get("text").and_then(Value::as_str).map(str::to_owned),
        Value::Null => None,
    }
}

/// Epoch milliseconds from a date or number cell.
fn millis(value: &Value) -> Option<EpochMillis> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        other => text(other).and_then(|s| s.trim().parse().ok()),
    }
}

/// Option names of a multi-select cell (also accepts a single select).
fn options(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        other => text(other).into_iter().collect(),
    }
}

/// `(id, name)` of the first person in a person cell.
fn person(value: &Value) -> Option<(String, String)> {
    let first = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let id = first.get("id").and_then(Value::as_str)?.to_owned();
    let name = first
        .get("name")
        .or_else(|| first.get("en_name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Some((id, name))
}

/// Parse a cycle cell such as `每2周` (every 2 weeks) or a bare number.
pub fn parse_cycle_weeks(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('每').unwrap_or(trimmed);
    let inner = inner.strip_suffix('周').unwrap_or(inner);
    inner.trim().parse().ok()
}

fn field<'a>(record: &'a TableRecord, name: &str) -> Option<&'a Value> {
    record.fields.get(name).filter(|v| !v.is_null())
}

fn required_text(record: &TableRecord, name: &str) -> Result<String> {
    field(record, name)
        .and_then(text)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing(record, name))
}

fn required_millis(record: &TableRecord, name: &str) -> Result<EpochMillis> {
    field(record, name)
        .and_then(millis)
        .ok_or_else(|| missing(record, name))
}

fn missing(record: &TableRecord, name: &str) -> BookingError {
    BookingError::Record(format!(
        "record {}: field '{name}' missing or malformed",
        record.record_id
    ))
}

/// Whether the row's status column reads `ON`.
pub fn is_enabled(record: &TableRecord, status_field: &str) -> bool {
    field(record, status_field)
        .and_then(text)
        .is_some_and(|s| s.trim() == STATUS_ON)
}

/// Read a task-table row.
pub fn parse_task(record: &TableRecord) -> Result<RecurringTaskDefinition> {
    let cycle_raw = required_text(record, TASK_CYCLE)?;
    let cycle_weeks = parse_cycle_weeks(&cycle_raw).ok_or_else(|| {
        BookingError::Record(format!(
            "record {}: cannot read cycle '{cycle_raw}'",
            record.record_id
        ))
    })?;

    let (booker_id, booker_name) = field(record, TASK_BOOKER)
        .and_then(person)
        .ok_or_else(|| missing(record, TASK_BOOKER))?;

    let allow_backup_room = match field(record, TASK_ALLOW_BACKUP) {
        Some(Value::Bool(b)) => *b,
        Some(other) => text(other).is_none_or(|s| !s.trim().eq_ignore_ascii_case("NO")),
        None => true,
    };

    Ok(RecurringTaskDefinition {
        task_id: required_text(record, TASK_ID)?,
        title: required_text(record, TASK_TITLE)?,
        first_start: required_millis(record, TASK_START)?,
        first_end: required_millis(record, TASK_END)?,
        cycle_weeks,
        preferred_room_names: field(record, TASK_PREFERRED_ROOMS)
            .map(options)
            .unwrap_or_default(),
        allow_backup_room,
        booker_id,
        booker_name,
    })
}

/// Read a room-config row.
pub fn parse_room(record: &TableRecord) -> Result<RoomConfig> {
    Ok(RoomConfig {
        room_id: required_text(record, ROOM_ID)?,
        room_name: field(record, ROOM_NAME).and_then(text).unwrap_or_default(),
        enabled: is_enabled(record, ROOM_STATUS),
    })
}

/// Read a completion row.
pub fn parse_completion(record: &TableRecord) -> Result<CompletionRecord> {
    Ok(CompletionRecord {
        task_id: required_text(record, TASK_ID)?,
        start: required_millis(record, TASK_START)?,
        end: required_millis(record, TASK_END)?,
        room_id: field(record, ROOM_ID).and_then(text).unwrap_or_default(),
        event_id: field(record, EVENT_ID).and_then(text).unwrap_or_default(),
    })
}

/// Cells for a new completion row.
pub fn completion_fields(record: &CompletionRecord) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(TASK_ID.to_owned(), json!(record.task_id));
    fields.insert(TASK_START.to_owned(), json!(record.start));
    fields.insert(TASK_END.to_owned(), json!(record.end));
    fields.insert(ROOM_ID.to_owned(), json!(record.room_id));
    fields.insert(EVENT_ID.to_owned(), json!(record.event_id));
    fields
}

/// Cells for a new room-config row; rooms start enabled.
pub fn room_fields(room: &MeetingRoom) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(ROOM_ID.to_owned(), json!(room.room_id));
    fields.insert(ROOM_NAME.to_owned(), json!(room.name));
    fields.insert(ROOM_STATUS.to_owned(), json!(STATUS_ON));
    fields
}
