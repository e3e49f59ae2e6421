//! [`BookingBackend`] backed by the Lark open platform.

use async_trait::async_trait;
use chrono::FixedOffset;
use tracing::{info, warn};

use crate::booking::backend::BookingBackend;
use crate::booking::types::{CompletionRecord, EpochMillis, RecurringTaskDefinition, RoomConfig};
use crate::config::{BitableConfig, RoomBotConfig, RoomsConfig};
use crate::error::{BookingError, Result};
use crate::lark::calendar::{NewEvent, display_time};
use crate::lark::client::LarkClient;
use crate::lark::tables;

/// Booking backend over the task/room/completion bitable and the app calendar.
#[derive(Debug)]
pub struct LarkBackend {
    client: LarkClient,
    /// Resolved bitable app token (the wiki node is already unwrapped).
    app_token: String,
    tables: BitableConfig,
    rooms: RoomsConfig,
    calendar_id: String,
    offset: FixedOffset,
    timezone: String,
}

impl LarkBackend {
    /// Build the client, unwrap a wiki-hosted bitable and resolve the primary calendar.
    pub async fn connect(config: &RoomBotConfig) -> Result<Self> {
        let client = LarkClient::new(config.app.clone())?;

        let app_token = if config.bitable.is_wiki {
            let token = client
                .resolve_wiki_bitable(&config.bitable.app_token)
                .await?;
            info!("resolved wiki node to bitable {token}");
            token
        } else {
            config.bitable.app_token.clone()
        };

        let calendar_id = client.primary_calendar_id().await?;

        Ok(Self {
            client,
            app_token,
            tables: config.bitable.clone(),
            rooms: config.rooms.clone(),
            calendar_id,
            offset: config.scheduler.offset()?,
            timezone: config.scheduler.timezone.clone(),
        })
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    /// Replace the room-config table with every room under the configured
    /// room levels, all switched on. Returns the number of rooms written.
    pub async fn initialize_room_config(&self) -> Result<usize> {
        if self.rooms.room_level_ids.is_empty() {
            return Err(BookingError::Config(
                "rooms.room_level_ids must list at least one room level".into(),
            ));
        }

        let mut rooms = Vec::new();
        for level_id in &self.rooms.room_level_ids {
            let found = self.client.list_rooms(level_id).await?;
            info!("room level {level_id}: {} rooms", found.len());
            rooms.extend(found);
        }

        let table = &self.tables.room_config_table_id;
        self.client.clear_table(&self.app_token, table).await?;
        let rows = rooms.iter().map(tables::room_fields).collect();
        let written = self
            .client
            .batch_create_records(&self.app_token, table, rows)
            .await?;
        info!("room config table initialised with {written} rooms");
        Ok(written)
    }
}

#[async_trait]
impl BookingBackend for LarkBackend {
    async fn list_enabled_tasks(&self) -> Result<Vec<RecurringTaskDefinition>> {
        let records = self
            .client
            .list_records(&self.app_token, &self.tables.task_table_id, None)
            .await?;

        let mut tasks = Vec::new();
        for record in records
            .iter()
            .filter(|r| tables::is_enabled(r, tables::TASK_STATUS))
        {
            match tables::parse_task(record) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!("skipping task row: {e}"),
            }
        }
        info!("{} enabled tasks", tasks.len());
        Ok(tasks)
    }

    async fn list_enabled_rooms(&self) -> Result<Vec<RoomConfig>> {
        let records = self
            .client
            .list_records(&self.app_token, &self.tables.room_config_table_id, None)
            .await?;

        let mut rooms = Vec::new();
        for record in &records {
            match tables::parse_room(record) {
                Ok(room) if room.enabled => rooms.push(room),
                Ok(_) => {}
                Err(e) => warn!("skipping room row: {e}"),
            }
        }
        Ok(rooms)
    }

    async fn list_completions(&self) -> Result<Vec<CompletionRecord>> {
        let records = self
            .client
            .list_records(&self.app_token, &self.tables.completed_table_id, None)
            .await?;

        let mut completions = Vec::with_capacity(records.len());
        for record in &records {
            match tables::parse_completion(record) {
                Ok(c) => completions.push(c),
                Err(e) => warn!("skipping completion row: {e}"),
            }
        }
        Ok(completions)
    }

    async fn room_busy(&self, room_id: &str, start: EpochMillis, end: EpochMillis) -> Result<bool> {
        let periods = self
            .client
            .room_busy_periods(room_id, start, end, &self.offset)
            .await?;
        Ok(!periods.is_empty())
    }

    async fn find_event(
        &self,
        title: &str,
        start: EpochMillis,
        end: EpochMillis,
    ) -> Result<Option<String>> {
        let events = self
            .client
            .list_events(&self.calendar_id, start, end)
            .await?;
        Ok(events
            .into_iter()
            .filter(|e| e.status.as_deref() != Some("cancelled"))
            .find(|e| {
                e.summary == title
                    && e.start_time.millis() == Some(start - start.rem_euclid(1000))
                    && e.end_time.millis() == Some(end - end.rem_euclid(1000))
            })
            .map(|e| e.event_id))
    }

    async fn create_event(
        &self,
        title: &str,
        start: EpochMillis,
        end: EpochMillis,
    ) -> Result<String> {
        info!(
            "creating event '{title}' {} - {}",
            display_time(start, &self.offset),
            display_time(end, &self.offset)
        );
        let event_id = self
            .client
            .create_event(
                &self.calendar_id,
                &NewEvent {
                    summary: title,
                    start,
                    end,
                    timezone: &self.timezone,
                },
            )
            .await?;
        info!("created event {event_id}");
        Ok(event_id)
    }

    async fn attach_room(&self, event_id: &str, room_id: &str) -> Result<()> {
        self.client
            .add_room_attendee(
                &self.calendar_id,
                event_id,
                room_id,
                &self.rooms.approval_reason,
            )
            .await?;
        info!("attached room {room_id} to event {event_id}");
        Ok(())
    }

    async fn invite_user(&self, event_id: &str, user_id: &str) -> Result<()> {
        self.client
            .add_user_attendee(&self.calendar_id, event_id, user_id)
            .await?;
        info!("invited {user_id} to event {event_id}");
        Ok(())
    }

    async fn record_completion(&self, record: &CompletionRecord) -> Result<()> {
        self.client
            .create_record(
                &self.app_token,
                &self.tables.completed_table_id,
                tables::completion_fields(record),
            )
            .await?;
        Ok(())
    }
}
