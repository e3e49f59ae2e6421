//! roombot: recurring meeting-room booking for the Lark/Feishu open platform.
//!
//! Task definitions, the room inventory and completion records live in a
//! bitable. Each polling cycle:
//! Task table → occurrences → drop completed → free rooms → pick room →
//! create event, attach room, invite booker → record completion

pub mod booking;
pub mod config;
pub mod error;
pub mod lark;
pub mod logging;

pub use config::RoomBotConfig;
pub use error::{BookingError, Result};
