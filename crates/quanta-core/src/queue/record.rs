//! Persisted slot layout: a JSON list of `{kind, payload}` entries.
//!
//! There is no version field; the kind discriminator is the compatibility
//! mechanism. Entries that fail to decode are reported, not fatal.

use serde::{Deserialize, Serialize};

use crate::domain::Task;
use crate::error::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub kind: String,
    pub payload: Vec<u8>,
}

impl PersistedEntry {
    pub fn from_task(task: &Task) -> serde_json::Result<Self> {
        Ok(Self {
            kind: task.kind().as_str().to_string(),
            payload: task.encode_payload()?,
        })
    }

    pub fn decode(&self) -> Result<Task, DecodeError> {
        Task::decode(&self.kind, &self.payload)
    }
}

/// Result of reading a slot: the tasks that decoded, in order, and why
/// the others were dropped.
#[derive(Debug, Default)]
pub struct DecodedSlot {
    pub tasks: Vec<Task>,
    pub discarded: Vec<DecodeError>,
}

pub fn encode_slot<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> serde_json::Result<Vec<u8>> {
    let entries = tasks
        .into_iter()
        .map(PersistedEntry::from_task)
        .collect::<serde_json::Result<Vec<_>>>()?;
    serde_json::to_vec(&entries)
}

/// Fails only when the outer list itself is unreadable. Each element is
/// decoded on its own, so one bad entry never takes its neighbours with it.
pub fn decode_slot(bytes: &[u8]) -> serde_json::Result<DecodedSlot> {
    let entries: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    let mut slot = DecodedSlot::default();
    for (index, value) in entries.into_iter().enumerate() {
        let decoded = serde_json::from_value::<PersistedEntry>(value)
            .map_err(|source| DecodeError::MalformedEntry { index, source })
            .and_then(|entry| entry.decode());
        match decoded {
            Ok(task) => slot.tasks.push(task),
            Err(e) => slot.discarded.push(e),
        }
    }
    Ok(slot)
}
