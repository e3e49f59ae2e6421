//! Boundary between the booking loop and the office-suite platform.

use async_trait::async_trait;

use crate::booking::types::{CompletionRecord, EpochMillis, RecurringTaskDefinition, RoomConfig};
use crate::error::Result;

/// External store and calendar operations used by the orchestrator.
///
/// Each method is a single request/response exchange; implementations fetch
/// all pages of a listing before returning.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    /// Enabled recurring task definitions. Unparseable rows are skipped.
    async fn list_enabled_tasks(&self) -> Result<Vec<RecurringTaskDefinition>>;

    /// Enabled rows of the room-config table.
    async fn list_enabled_rooms(&self) -> Result<Vec<RoomConfig>>;

    /// Every completion recorded so far.
    async fn list_completions(&self) -> Result<Vec<CompletionRecord>>;

    /// Whether the room has any busy period overlapping `[start, end)`.
    async fn room_busy(&self, room_id: &str, start: EpochMillis, end: EpochMillis) -> Result<bool>;

    /// Look up an already created event with this exact title and interval.
    ///
    /// Backends without an idempotent lookup keep the default.
    async fn find_event(
        &self,
        _title: &str,
        _start: EpochMillis,
        _end: EpochMillis,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    /// Create a calendar event and return its id.
    async fn create_event(&self, title: &str, start: EpochMillis, end: EpochMillis)
    -> Result<String>;

    /// Add a meeting room to an event.
    async fn attach_room(&self, event_id: &str, room_id: &str) -> Result<()>;

    /// Invite a user to an event.
    async fn invite_user(&self, event_id: &str, user_id: &str) -> Result<()>;

    /// Persist a completion record.
    async fn record_completion(&self, record: &CompletionRecord) -> Result<()>;
}
