//! Scripted channel doubles.
//!
//! `ScriptedChannel` replays pre-arranged feedback sequences and records what
//! was submitted; it validates the dispatch loop without a browser.
//! `NullChannel` backs `--dry-run`: it accepts everything and reports a
//! canned confirmation.

use async_trait::async_trait;

use super::{ChannelError, DeliveryChannel};

/// One scripted reaction to a `submit` call.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Return these feedback texts
    Feedback(Vec<String>),
    /// Fail structurally with this description
    Structural(String),
}

impl ScriptedOutcome {
    pub fn feedback(texts: &[&str]) -> Self {
        ScriptedOutcome::Feedback(texts.iter().map(|s| s.to_string()).collect())
    }
}

/// A recorded submission: (recipient id, message).
pub type Submission = (String, String);

/// Test double replaying scripted outcomes in order.
///
/// Once the script is exhausted, further submissions return empty feedback
/// (which the loop classifies as a failure).
pub struct ScriptedChannel {
    script: Vec<ScriptedOutcome>,
    cursor: usize,
    open_error: Option<String>,
    /// Everything submitted through this channel, in order
    pub submissions: Vec<Submission>,
    /// Number of times `open` was called
    pub opens: usize,
    /// Whether the channel is currently open
    pub open_now: bool,
    /// Whether `close` was called at least once
    pub closed: bool,
}

impl ScriptedChannel {
    pub fn new(script: Vec<ScriptedOutcome>) -> Self {
        Self {
            script,
            cursor: 0,
            open_error: None,
            submissions: Vec::new(),
            opens: 0,
            open_now: false,
            closed: false,
        }
    }

    /// A channel whose `open` always fails with a session error, as when
    /// login never completes.
    pub fn failing_open(reason: &str) -> Self {
        let mut channel = Self::new(Vec::new());
        channel.open_error = Some(reason.to_string());
        channel
    }

    /// A channel that confirms every submission.
    pub fn always_success(len: usize) -> Self {
        Self::new(vec![
            ScriptedOutcome::feedback(&["쪽지가 전송되었습니다."]);
            len
        ])
    }
}

#[async_trait]
impl DeliveryChannel for ScriptedChannel {
    async fn open(&mut self) -> Result<(), ChannelError> {
        self.opens += 1;
        if let Some(reason) = &self.open_error {
            return Err(ChannelError::Session(reason.clone()));
        }
        self.open_now = true;
        Ok(())
    }

    async fn submit(
        &mut self,
        recipient_id: &str,
        message: &str,
    ) -> Result<Vec<String>, ChannelError> {
        if !self.open_now {
            return Err(ChannelError::Session("channel not open".to_string()));
        }

        self.submissions
            .push((recipient_id.to_string(), message.to_string()));

        let outcome = self.script.get(self.cursor).cloned();
        self.cursor += 1;

        match outcome {
            Some(ScriptedOutcome::Feedback(texts)) => Ok(texts),
            Some(ScriptedOutcome::Structural(reason)) => {
                // A structural fault leaves the surface in an unknown state;
                // the loop must re-open before the next submission.
                self.open_now = false;
                Err(ChannelError::SurfaceNotFound(reason))
            }
            None => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) {
        self.open_now = false;
        self.closed = true;
    }
}

/// Dry-run channel: accepts every submission and confirms it.
#[derive(Debug, Default)]
pub struct NullChannel {
    pub submitted: usize,
}

#[async_trait]
impl DeliveryChannel for NullChannel {
    async fn open(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn submit(
        &mut self,
        recipient_id: &str,
        _message: &str,
    ) -> Result<Vec<String>, ChannelError> {
        self.submitted += 1;
        log::info!("dry-run: would send to {}", recipient_id);
        Ok(vec!["전송되었습니다".to_string()])
    }

    async fn close(&mut self) {}
}
