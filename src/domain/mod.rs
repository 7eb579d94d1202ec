//! Domain types for sendr - recipients, batches, and dispatch records.

mod recipient;
mod record;

pub use recipient::{Batch, Recipient};
pub use record::{DeliveryStatus, DispatchRecord, RunMeta, StatusSnapshot, now_ts};
