//! Recipient and batch types.
//!
//! A Batch is the full input to one dispatch run: the ordered recipient list
//! plus the base message. Both are immutable for the duration of a run; the
//! engine derives message variants but never rewrites the base.

use serde::{Deserialize, Serialize};

/// One entry from the recipient list.
///
/// The identifier is kept exactly as loaded (including blanks) so that
/// record indices stay aligned with the source file; the dispatch loop is
/// responsible for failing blank ids without touching the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    /// Recipient identifier on the destination service
    pub id: String,

    /// Optional display name, carried for operator output only
    pub nick: Option<String>,

    /// Accumulated contribution amount; display-only, never affects dispatch
    pub weight: u64,
}

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nick: None,
            weight: 0,
        }
    }

    /// Identifier with surrounding whitespace removed.
    pub fn trimmed_id(&self) -> &str {
        self.id.trim()
    }

    /// True if the identifier is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.trimmed_id().is_empty()
    }
}

/// The full input to a dispatch run.
#[derive(Debug, Clone)]
pub struct Batch {
    pub recipients: Vec<Recipient>,
    pub base_message: String,
}

impl Batch {
    pub fn new(recipients: Vec<Recipient>, base_message: impl Into<String>) -> Self {
        Self {
            recipients,
            base_message: base_message.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}
