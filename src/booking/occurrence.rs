//! Next-occurrence calculation for recurring booking tasks.
//!
//! Bookings can only be made a limited number of days ahead, so each polling
//! cycle projects every definition onto the current period and the next one
//! and keeps the candidates that are still in the future and inside the
//! booking horizon.

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::booking::types::{EpochMillis, Occurrence, RecurringTaskDefinition};

/// Default number of days ahead the calendar accepts bookings for.
pub const DEFAULT_HORIZON_DAYS: i64 = 7;

const MILLIS_PER_WEEK: i64 = 7 * 24 * 60 * 60 * 1000;

/// Why a definition cannot be projected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDefinition {
    #[error("task {task_id}: end must be after start (duration {duration_ms} ms)")]
    NonPositiveDuration { task_id: String, duration_ms: i64 },

    #[error("task {task_id}: cycle must be at least one week")]
    ZeroCycle { task_id: String },

    #[error("task {task_id}: occurrence time out of range")]
    OutOfRange { task_id: String },
}

/// Compute the upcoming occurrences of `def` as seen at `now`.
///
/// Returns zero, one or two occurrences in chronological order. Calendar
/// dates are taken in `now`'s time zone. The period count uses the date-only
/// distance, so on the day an occurrence is due but before its start time
/// both that occurrence and the next period's are returned.
pub fn compute_occurrences<Tz: TimeZone>(
    def: &RecurringTaskDefinition,
    now: &DateTime<Tz>,
    horizon_days: i64,
) -> Result<Vec<Occurrence>, InvalidDefinition> {
    let out_of_range = || InvalidDefinition::OutOfRange {
        task_id: def.task_id.clone(),
    };

    let duration = def
        .first_end
        .checked_sub(def.first_start)
        .ok_or_else(out_of_range)?;
    if duration <= 0 {
        return Err(InvalidDefinition::NonPositiveDuration {
            task_id: def.task_id.clone(),
            duration_ms: duration,
        });
    }
    if def.cycle_weeks == 0 {
        return Err(InvalidDefinition::ZeroCycle {
            task_id: def.task_id.clone(),
        });
    }

    let tz = now.timezone();
    let now_ms = now.timestamp_millis();
    let now_date = now.date_naive();
    let first_date = local_date(&tz, def.first_start).ok_or_else(out_of_range)?;

    let cycle_days = i64::from(def.cycle_weeks) * 7;
    let period = i64::from(def.cycle_weeks) * MILLIS_PER_WEEK;

    let cycle_count = if now_ms < def.first_start {
        0
    } else {
        (now_date - first_date).num_days().div_euclid(cycle_days)
    };

    let mut occurrences = Vec::with_capacity(2);
    for n in [cycle_count, cycle_count + 1] {
        let start = n
            .checked_mul(period)
            .and_then(|offset| def.first_start.checked_add(offset))
            .ok_or_else(out_of_range)?;
        let end = start.checked_add(duration).ok_or_else(out_of_range)?;
        let start_date = local_date(&tz, start).ok_or_else(out_of_range)?;

        if start > now_ms && (start_date - now_date).num_days() <= horizon_days {
            occurrences.push(Occurrence::of(def, start, end));
        }
    }

    Ok(occurrences)
}

fn local_date<Tz: TimeZone>(tz: &Tz, at: EpochMillis) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(at)
        .single()
        .map(|dt| dt.date_naive())
}
