//! Dispatch records and the status snapshot.
//!
//! The StatusSnapshot is the single externally visible source of truth for a
//! run: one record per recipient plus run metadata, rewritten wholesale after
//! every attempt. An external dashboard polls it read-only.

use serde::{Deserialize, Serialize};

use super::recipient::Batch;

/// Human-readable local timestamp, matching the snapshot's on-disk format.
pub fn now_ts() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Per-recipient dispatch state.
///
/// `pending` transitions to exactly one of `success` or `fail` within a run;
/// a recipient left `pending` by a stop or crash is reconciled on the next
/// run, never retried inside the same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Fail,
}

impl DeliveryStatus {
    /// Returns true once the recipient has a final outcome for this run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Success | DeliveryStatus::Fail)
    }
}

/// One persisted entry per recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchRecord {
    /// Stable 0-based position in the batch
    pub index: usize,

    /// Recipient identifier, denormalized for display without the batch
    pub id: String,

    /// Carried-through contribution amount; display only
    #[serde(default)]
    pub weight: u64,

    pub status: DeliveryStatus,

    /// Last state change, "%Y-%m-%d %H:%M:%S" local time
    pub updated: String,
}

/// Run metadata block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunMeta {
    #[serde(default)]
    pub created: String,
}

/// The complete, periodically rewritten view of all dispatch records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub items: Vec<DispatchRecord>,
    pub meta: RunMeta,
}

impl StatusSnapshot {
    /// Build a fresh snapshot from a batch: one pending record per recipient,
    /// indices contiguous from 0.
    pub fn from_batch(batch: &Batch) -> Self {
        let ts = now_ts();
        let items = batch
            .recipients
            .iter()
            .enumerate()
            .map(|(index, r)| DispatchRecord {
                index,
                id: r.id.clone(),
                weight: r.weight,
                status: DeliveryStatus::Pending,
                updated: ts.clone(),
            })
            .collect();

        Self {
            items,
            meta: RunMeta { created: ts },
        }
    }

    /// True if this snapshot still matches the batch it was built from.
    pub fn matches_batch(&self, batch: &Batch) -> bool {
        self.items.len() == batch.len()
    }

    /// Record a final outcome for the recipient at `index`.
    pub fn mark(&mut self, index: usize, status: DeliveryStatus) {
        if let Some(record) = self.items.get_mut(index) {
            record.status = status;
            record.updated = now_ts();
        }
    }

    /// (pending, success, fail) counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut pending = 0;
        let mut success = 0;
        let mut fail = 0;
        for item in &self.items {
            match item.status {
                DeliveryStatus::Pending => pending += 1,
                DeliveryStatus::Success => success += 1,
                DeliveryStatus::Fail => fail += 1,
            }
        }
        (pending, success, fail)
    }
}
