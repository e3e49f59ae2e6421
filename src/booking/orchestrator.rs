//! Booking polling loop.
//!
//! Every cycle re-reads the task, room-config and completion tables, projects
//! the task definitions onto upcoming occurrences and books each pending one
//! in turn. A completion record is written only after every booking call for
//! an occurrence succeeded, so a partial failure is retried on a later cycle.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::booking::backend::BookingBackend;
use crate::booking::occurrence::compute_occurrences;
use crate::booking::selection::{RoomDirectory, filter_pending, select_room};
use crate::booking::types::{CompletionRecord, EpochMillis, Occurrence, RecurringTaskDefinition};
use crate::config::SchedulerConfig;
use crate::error::{BookingError, Result};

/// Runtime knobs of the booking loop.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Delay between the starts of two cycles.
    pub poll_interval: Duration,
    /// How many calendar days ahead occurrences are booked.
    pub horizon_days: i64,
    /// Offset in which calendar dates are evaluated.
    pub utc_offset: FixedOffset,
    /// Reuse an existing identical event instead of creating a new one.
    pub resume_existing_events: bool,
}

impl OrchestratorSettings {
    /// Derive settings from the `[scheduler]` config section.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self> {
        Ok(Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            horizon_days: config.horizon_days,
            utc_offset: config.offset()?,
            resume_existing_events: config.resume_existing_events,
        })
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(600),
            horizon_days: crate::booking::occurrence::DEFAULT_HORIZON_DAYS,
            utc_offset: Utc.fix(),
            resume_existing_events: false,
        }
    }
}

/// Counters for one polling cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Enabled task definitions read.
    pub definitions: usize,
    /// Definitions skipped as invalid.
    pub rejected_definitions: usize,
    /// Occurrences left after removing completed ones.
    pub pending: usize,
    /// Occurrences fully booked and recorded.
    pub booked: usize,
    /// Occurrences with no acceptable free room this cycle.
    pub unassigned: usize,
    /// Occurrences whose booking failed part-way or were malformed.
    pub failed: usize,
}

/// Result of trying to book one occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked { room_id: String, event_id: String },
    Unassigned,
}

/// A room taken earlier in the same cycle.
#[derive(Debug, Clone)]
struct Claim {
    room_id: String,
    start: EpochMillis,
    end: EpochMillis,
}

impl Claim {
    fn blocks(&self, room_id: &str, start: EpochMillis, end: EpochMillis) -> bool {
        self.room_id == room_id && self.start < end && start < self.end
    }
}

/// Drives the booking cycle against a [`BookingBackend`].
pub struct BookingOrchestrator<B> {
    backend: B,
    settings: OrchestratorSettings,
}

impl<B: BookingBackend> BookingOrchestrator<B> {
    pub fn new(backend: B, settings: OrchestratorSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Current wall-clock time in the configured offset.
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.settings.utc_offset)
    }

    /// Run cycles until `shutdown` fires or a fatal error occurs.
    ///
    /// Transient failures are logged and retried on the next tick.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "booking loop started, polling every {}s",
            self.settings.poll_interval.as_secs()
        );
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("booking loop stopped");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            match self.run_cycle(self.now()).await {
                Ok(report) => info!(
                    definitions = report.definitions,
                    rejected = report.rejected_definitions,
                    pending = report.pending,
                    booked = report.booked,
                    unassigned = report.unassigned,
                    failed = report.failed,
                    "booking cycle finished"
                ),
                Err(e) if e.is_fatal() => {
                    error!("booking loop aborted: {e}");
                    return Err(e);
                }
                Err(e) => warn!("booking cycle failed, retrying next cycle: {e}"),
            }
        }
    }

    /// Execute one cycle as seen at `now`.
    pub async fn run_cycle(&self, now: DateTime<FixedOffset>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let tasks = self.backend.list_enabled_tasks().await?;
        report.definitions = tasks.len();
        if tasks.is_empty() {
            info!("no enabled booking tasks");
            return Ok(report);
        }

        let directory = RoomDirectory::new(self.backend.list_enabled_rooms().await?);
        if directory.is_empty() {
            return Err(BookingError::NoRoomsConfigured);
        }

        let pending = self.pending_occurrences(&tasks, &now, &mut report).await?;
        report.pending = pending.len();
        debug!(
            "{} pending occurrences over {} rooms",
            pending.len(),
            directory.len()
        );

        let mut claims = Vec::new();
        for occurrence in &pending {
            match self.book(occurrence, &directory, &mut claims).await {
                Ok(BookingOutcome::Booked { .. }) => report.booked += 1,
                Ok(BookingOutcome::Unassigned) => report.unassigned += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        task_id = %occurrence.task_id,
                        start = occurrence.start,
                        "booking failed, will retry next cycle: {e}"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Pending occurrences as seen at `now`, without booking anything.
    pub async fn plan(&self, now: DateTime<FixedOffset>) -> Result<Vec<Occurrence>> {
        let tasks = self.backend.list_enabled_tasks().await?;
        let mut report = CycleReport::default();
        self.pending_occurrences(&tasks, &now, &mut report).await
    }

    async fn pending_occurrences(
        &self,
        tasks: &[RecurringTaskDefinition],
        now: &DateTime<FixedOffset>,
        report: &mut CycleReport,
    ) -> Result<Vec<Occurrence>> {
        let mut occurrences = Vec::new();
        for def in tasks {
            match compute_occurrences(def, now, self.settings.horizon_days) {
                Ok(found) => occurrences.extend(found),
                Err(e) => {
                    warn!("skipping invalid task definition: {e}");
                    report.rejected_definitions += 1;
                }
            }
        }
        if occurrences.is_empty() {
            return Ok(occurrences);
        }

        let completed = self.backend.list_completions().await?;
        Ok(filter_pending(occurrences, &completed))
    }

    /// Book one occurrence: pick a free room, create the event, attach the
    /// room, invite the booker and record completion.
    async fn book(
        &self,
        occurrence: &Occurrence,
        directory: &RoomDirectory,
        claims: &mut Vec<Claim>,
    ) -> Result<BookingOutcome> {
        let (start, end) = (occurrence.start, occurrence.end);
        if end <= start {
            return Err(BookingError::Record(format!(
                "task {}: end {end} is not after start {start}",
                occurrence.task_id
            )));
        }

        let mut available = Vec::new();
        for room_id in directory.ids() {
            if claims.iter().any(|c| c.blocks(room_id, start, end)) {
                continue;
            }
            if !self.backend.room_busy(room_id, start, end).await? {
                available.push(room_id.to_owned());
            }
        }

        debug!(
            task_id = %occurrence.task_id,
            "free rooms: {:?}",
            directory.ids_to_names(&available)
        );

        let preferred = directory.names_to_ids(&occurrence.preferred_room_names);
        if preferred.len() != occurrence.preferred_room_names.len() {
            warn!(
                task_id = %occurrence.task_id,
                "some preferred rooms are unknown or disabled: {:?}",
                occurrence.preferred_room_names
            );
        }

        let Some(room_id) = select_room(&available, &preferred, occurrence.allow_backup_room)
        else {
            info!(
                task_id = %occurrence.task_id,
                start,
                available = available.len(),
                "no acceptable room free, leaving for next cycle"
            );
            return Ok(BookingOutcome::Unassigned);
        };
        let room_name = directory.name_for_id(&room_id).unwrap_or_default();

        let existing = if self.settings.resume_existing_events {
            self.backend
                .find_event(&occurrence.title, start, end)
                .await?
        } else {
            None
        };
        let event_id = match existing {
            Some(id) => {
                info!(task_id = %occurrence.task_id, event_id = %id, "reusing existing event");
                id
            }
            None => {
                self.backend
                    .create_event(&occurrence.title, start, end)
                    .await?
            }
        };

        self.backend.attach_room(&event_id, &room_id).await?;
        claims.push(Claim {
            room_id: room_id.clone(),
            start,
            end,
        });

        self.backend
            .invite_user(&event_id, &occurrence.booker_id)
            .await?;

        self.backend
            .record_completion(&CompletionRecord {
                task_id: occurrence.task_id.clone(),
                start,
                end,
                room_id: room_id.clone(),
                event_id: event_id.clone(),
            })
            .await?;

        info!(
            task_id = %occurrence.task_id,
            event_id = %event_id,
            room = %room_name,
            booker = %occurrence.booker_name,
            "booked '{}'",
            occurrence.title
        );
        Ok(BookingOutcome::Booked { room_id, event_id })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn claim_blocks_only_overlapping_same_room() {
        let claim = Claim {
            room_id: "omm_1".into(),
            start: 100,
            end: 200,
        };
        assert!(claim.blocks("omm_1", 150, 250));
        assert!(claim.blocks("omm_1", 50, 101));
        assert!(!claim.blocks("omm_1", 200, 300));
        assert!(!claim.blocks("omm_1", 0, 100));
        assert!(!claim.blocks("omm_2", 150, 250));
    }

    #[test]
    fn settings_from_default_config() {
        let settings = OrchestratorSettings::from_config(&SchedulerConfig::default()).unwrap();
        assert_eq!(settings.poll_interval, Duration::from_secs(600));
        assert_eq!(settings.horizon_days, 7);
        assert_eq!(settings.utc_offset.local_minus_utc(), 8 * 3600);
        assert!(!settings.resume_existing_events);
    }
}
