//! Completed-occurrence filtering and room choice.

use std::collections::HashSet;

use crate::booking::types::{CompletionKey, CompletionRecord, Occurrence, RoomConfig};

/// Drop occurrences that already have a completion record.
///
/// Matching uses `(task_id, start, end)` only. Order is preserved.
pub fn filter_pending(
    occurrences: Vec<Occurrence>,
    completed: &[CompletionRecord],
) -> Vec<Occurrence> {
    let done: HashSet<CompletionKey> = completed.iter().map(CompletionRecord::key).collect();
    occurrences
        .into_iter()
        .filter(|o| !done.contains(&o.key()))
        .collect()
}

/// Pick a room for one occurrence.
///
/// The first preferred room (in preference order) that is available wins.
/// Without one, the first available non-preferred room is used when
/// `allow_backup` is set.
pub fn select_room(
    available_room_ids: &[String],
    preferred_room_ids: &[String],
    allow_backup: bool,
) -> Option<String> {
    if available_room_ids.is_empty() {
        return None;
    }

    if let Some(preferred) = preferred_room_ids
        .iter()
        .find(|id| available_room_ids.contains(id))
    {
        return Some(preferred.clone());
    }

    if !allow_backup {
        return None;
    }

    available_room_ids
        .iter()
        .find(|id| !preferred_room_ids.contains(id))
        .cloned()
}

/// Name/id lookup over the enabled rooms of one room-config snapshot.
#[derive(Debug, Clone, Default)]
pub struct RoomDirectory {
    rooms: Vec<RoomConfig>,
}

impl RoomDirectory {
    /// Build from a room-config snapshot; disabled rows are ignored.
    pub fn new(rooms: impl IntoIterator<Item = RoomConfig>) -> Self {
        Self {
            rooms: rooms.into_iter().filter(|r| r.enabled).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Room ids in table order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rooms.iter().map(|r| r.room_id.as_str())
    }

    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.rooms
            .iter()
            .find(|r| r.room_name == name)
            .map(|r| r.room_id.as_str())
    }

    pub fn name_for_id(&self, id: &str) -> Option<&str> {
        self.rooms
            .iter()
            .find(|r| r.room_id == id)
            .map(|r| r.room_name.as_str())
    }

    /// Translate display names to ids, keeping order and dropping unknown names.
    pub fn names_to_ids(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter_map(|n| self.id_for_name(n))
            .map(str::to_owned)
            .collect()
    }

    /// Translate ids to display names, keeping order and dropping unknown ids.
    pub fn ids_to_names(&self, ids: &[String]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.name_for_id(id))
            .map(str::to_owned)
            .collect()
    }
}
