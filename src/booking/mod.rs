//! Recurring meeting-room booking.
//!
//! The pure core ([`occurrence`], [`selection`]) turns task definitions into
//! bookable occurrences and picks rooms; [`orchestrator`] drives it against a
//! [`BookingBackend`].

pub mod backend;
pub mod occurrence;
pub mod orchestrator;
pub mod selection;
pub mod types;

pub use backend::BookingBackend;
pub use occurrence::{DEFAULT_HORIZON_DAYS, InvalidDefinition, compute_occurrences};
pub use orchestrator::{BookingOrchestrator, BookingOutcome, CycleReport, OrchestratorSettings};
pub use selection::{RoomDirectory, filter_pending, select_room};
pub use types::{
    CompletionKey, CompletionRecord, EpochMillis, Occurrence, RecurringTaskDefinition, RoomConfig,
};
