//! Plain records shared by the booking core and the backend boundary.

/// Milliseconds since the Unix epoch.
pub type EpochMillis = i64;

/// A recurring booking request, as read from the task table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringTaskDefinition {
    /// Stable task identifier (e.g. `"ID0011"`).
    pub task_id: String,
    /// Calendar event title.
    pub title: String,
    /// Start of the first occurrence.
    pub first_start: EpochMillis,
    /// End of the first occurrence.
    pub first_end: EpochMillis,
    /// Repeat every N weeks.
    pub cycle_weeks: u32,
    /// Preferred rooms by display name, most preferred first.
    pub preferred_room_names: Vec<String>,
    /// Whether a non-preferred room may be booked when no preferred one is free.
    pub allow_backup_room: bool,
    /// Open id of the person the booking is made for.
    pub booker_id: String,
    /// Display name of the booker.
    pub booker_name: String,
}

/// One concrete, bookable instance of a [`RecurringTaskDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub task_id: String,
    pub title: String,
    pub start: EpochMillis,
    pub end: EpochMillis,
    pub preferred_room_names: Vec<String>,
    pub allow_backup_room: bool,
    pub booker_id: String,
    pub booker_name: String,
}

impl Occurrence {
    /// Instantiate `def` at the given interval.
    pub fn of(def: &RecurringTaskDefinition, start: EpochMillis, end: EpochMillis) -> Self {
        Self {
            task_id: def.task_id.clone(),
            title: def.title.clone(),
            start,
            end,
            preferred_room_names: def.preferred_room_names.clone(),
            allow_backup_room: def.allow_backup_room,
            booker_id: def.booker_id.clone(),
            booker_name: def.booker_name.clone(),
        }
    }

    /// Dedup key of this occurrence.
    pub fn key(&self) -> CompletionKey {
        CompletionKey {
            task_id: self.task_id.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// A row of the room-config table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    pub room_id: String,
    pub room_name: String,
    pub enabled: bool,
}

/// Persisted proof that an occurrence has been booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub task_id: String,
    pub start: EpochMillis,
    pub end: EpochMillis,
    pub room_id: String,
    pub event_id: String,
}

impl CompletionRecord {
    /// Dedup key; `room_id` and `event_id` do not participate.
    pub fn key(&self) -> CompletionKey {
        CompletionKey {
            task_id: self.task_id.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// `(task_id, start, end)`: at most one completion may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompletionKey {
    pub task_id: String,
    pub start: EpochMillis,
    pub end: EpochMillis,
}
