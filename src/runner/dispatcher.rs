//! The dispatch loop.
//!
//! Walks the batch in index order, derives each outgoing message variant,
//! submits it through the delivery channel, classifies the feedback, and
//! rewrites the status snapshot after every attempt so progress is never
//! lost to a later crash. Strictly sequential: the channel models one
//! exclusive compose surface, so one recipient is ever in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;

use crate::channel::DeliveryChannel;
use crate::classify::{FeedbackClassifier, Verdict};
use crate::domain::{Batch, DeliveryStatus, StatusSnapshot};
use crate::error::Result;
use crate::mutate::mutate;
use crate::store::StatusStore;

/// How mutation sequence numbers relate to batch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SequenceMode {
    /// Sequence = sends attempted so far in this run. A resumed run
    /// (`start > 0`) restarts the cadence at zero and reuses mutation groups
    /// from earlier runs. This reproduces the original behavior.
    #[default]
    RunRelative,
    /// Sequence = the recipient's batch index, so a resumed run continues
    /// the global cadence instead of restarting it.
    Absolute,
}

/// Operator-supplied run parameters.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    /// Skip indices below this offset (skipped indices do not count toward
    /// `limit`)
    pub start: usize,

    /// Cap on attempted sends; 0 means unbounded
    pub limit: usize,

    /// Force fresh status initialization even if a usable snapshot exists
    pub reset: bool,

    pub sequence_mode: SequenceMode,
}

/// Randomized inter-attempt delay range, so the request cadence is not a
/// fixed, detectable interval.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min_ms: 200,
            max_ms: 2_000,
        }
    }
}

impl Pacing {
    /// No delay; for tests and dry runs.
    pub fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    fn jitter(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

/// Explicit run handle shared between the launcher and the loop.
///
/// The only inbound control while a run is in flight is this cancellation
/// flag; everything else (progress, outcomes) flows out through the status
/// store.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    cancel: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the loop to stop after the in-flight attempt. Recipients not
    /// yet attempted stay `pending` for a future run.
    pub fn request_stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Iteration completed or the attempt limit was reached
    Finished,
    /// Stopped via the run context; remaining recipients left pending
    Stopped,
}

/// Tally of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Sends actually attempted through the channel
    pub attempted: usize,
    pub success: usize,
    /// Records marked failed this run, including blank ids that never
    /// reached the channel
    pub fail: usize,
    pub outcome: RunOutcome,
}

/// The dispatch loop, generic over its channel and classifier seams.
pub struct Dispatcher<C, F>
where
    C: DeliveryChannel,
    F: FeedbackClassifier,
{
    channel: C,
    classifier: F,
    store: StatusStore,
    pacing: Pacing,
}

impl<C, F> Dispatcher<C, F>
where
    C: DeliveryChannel,
    F: FeedbackClassifier,
{
    pub fn new(channel: C, classifier: F, store: StatusStore) -> Self {
        Self {
            channel,
            classifier,
            store,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Run the batch to completion, limit, or stop request.
    ///
    /// The channel is released on every exit path, including errors raised
    /// mid-submission.
    pub async fn run(
        &mut self,
        batch: &Batch,
        params: &RunParams,
        ctx: &RunContext,
    ) -> Result<RunSummary> {
        // (Re)build the roster before sending anything so an observer sees
        // the complete batch immediately, not just processed items. This
        // first write is the one persistence step allowed to abort the run:
        // nothing has been sent yet and an unwritable store means the
        // operator would be flying blind.
        let mut snapshot = match self.store.load() {
            Some(existing) if !params.reset && existing.matches_batch(batch) => existing,
            _ => {
                let fresh = StatusSnapshot::from_batch(batch);
                self.store.save(&fresh)?;
                log::info!("status initialized: {} records", fresh.items.len());
                fresh
            }
        };

        // A failed open may still have acquired resources (a live browser
        // session mid-login); release before propagating.
        if let Err(e) = self.channel.open().await {
            self.channel.close().await;
            return Err(e.into());
        }

        let result = self.run_inner(batch, params, ctx, &mut snapshot).await;
        self.channel.close().await;
        result
    }

    async fn run_inner(
        &mut self,
        batch: &Batch,
        params: &RunParams,
        ctx: &RunContext,
        snapshot: &mut StatusSnapshot,
    ) -> Result<RunSummary> {
        let mut attempted = 0usize;
        let mut success = 0usize;
        let mut fail = 0usize;

        for (index, recipient) in batch.recipients.iter().enumerate() {
            if ctx.stop_requested() {
                log::info!("stop requested, leaving remaining recipients pending");
                return Ok(RunSummary {
                    attempted,
                    success,
                    fail,
                    outcome: RunOutcome::Stopped,
                });
            }

            if index < params.start {
                continue;
            }
            if params.limit > 0 && attempted >= params.limit {
                break;
            }

            // Blank ids never reach the channel and do not count as
            // attempted sends (no limit charge, no pacing delay).
            if recipient.is_blank() {
                log::warn!("recipient {} has a blank id, marking failed", index);
                snapshot.mark(index, DeliveryStatus::Fail);
                self.persist(snapshot);
                fail += 1;
                continue;
            }

            let seq = match params.sequence_mode {
                SequenceMode::RunRelative => attempted as u64,
                SequenceMode::Absolute => index as u64,
            };
            let message = mutate(&batch.base_message, seq);

            let verdict = match self.channel.submit(recipient.trimmed_id(), &message).await {
                Ok(texts) => self.classifier.classify(&texts),
                Err(e) => {
                    // Structural failure: nothing to classify. Restore the
                    // channel best-effort so the next recipient gets a
                    // working surface.
                    log::warn!("submit to {} failed structurally: {}", recipient.trimmed_id(), e);
                    if let Err(e) = self.channel.open().await {
                        log::warn!("channel restore failed: {}", e);
                    }
                    Verdict::Failure
                }
            };

            // Undetermined collapses to fail: better to under-report success
            // than to silently miss a block.
            let status = match verdict {
                Verdict::Success => DeliveryStatus::Success,
                Verdict::Failure | Verdict::Undetermined => DeliveryStatus::Fail,
            };
            match status {
                DeliveryStatus::Success => success += 1,
                _ => fail += 1,
            }
            attempted += 1;

            snapshot.mark(index, status);
            self.persist(snapshot);

            log::info!(
                "[{}/{}] {} -> {:?}",
                index + 1,
                batch.len(),
                recipient.trimmed_id(),
                status
            );

            tokio::time::sleep(self.pacing.jitter()).await;
        }

        Ok(RunSummary {
            attempted,
            success,
            fail,
            outcome: RunOutcome::Finished,
        })
    }

    /// Best-effort snapshot rewrite: an I/O error must not kill the run, and
    /// the next rewrite self-heals.
    fn persist(&self, snapshot: &StatusSnapshot) {
        if let Err(e) = self.store.save(snapshot) {
            log::error!("status write failed, will retry on next attempt: {}", e);
        }
    }
}
