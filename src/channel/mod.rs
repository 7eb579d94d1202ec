//! Delivery channel abstraction.
//!
//! A channel models one exclusive compose surface on the destination
//! service: it can be opened once, accepts one (recipient, message) pair at a
//! time, and surfaces whatever transient feedback text the service renders.
//! The dispatch loop only sees this trait; the browser-bound implementation
//! lives in [`panda`], and scripted doubles for tests and dry runs live in
//! [`script`].

mod script;
pub mod panda;
pub mod webdriver;

pub use script::{NullChannel, ScriptedChannel, ScriptedOutcome};

use async_trait::async_trait;
use thiserror::Error;

use crate::error::SendrError;

/// Faults a channel can report.
///
/// Everything here is structural: there was no feedback to classify, the
/// submission itself could not be carried out. The dispatch loop records
/// these as an immediate per-recipient failure and tries to restore the
/// channel before the next recipient.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A required input surface (recipient field, message box) was not found
    #[error("Input surface not found: {0}")]
    SurfaceNotFound(String),

    /// A control was present but could not be driven (not clickable)
    #[error("Control not interactable: {0}")]
    NotInteractable(String),

    /// The bounded wait for an element or feedback elapsed
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// Session-level fault: login failed, session dropped, cannot recover
    #[error("Session error: {0}")]
    Session(String),

    /// Wire-level fault talking to the driver
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<ChannelError> for SendrError {
    fn from(err: ChannelError) -> Self {
        SendrError::Channel(err.to_string())
    }
}

/// Capability to submit one message to one recipient and observe feedback.
#[async_trait]
pub trait DeliveryChannel: Send {
    /// Establish the session and compose surface. Idempotent: opening an
    /// already-open channel is a no-op.
    async fn open(&mut self) -> Result<(), ChannelError>;

    /// Submit one (recipient, message) pair. Blocks until transient feedback
    /// is observed or a bounded timeout elapses, dismisses any blocking
    /// acknowledgement dialog, and returns the collected feedback texts
    /// (possibly empty). A structural failure is returned as an error.
    async fn submit(
        &mut self,
        recipient_id: &str,
        message: &str,
    ) -> Result<Vec<String>, ChannelError>;

    /// Release the underlying session. Safe to call more than once.
    async fn close(&mut self);
}
