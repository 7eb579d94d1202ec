//! sendr - batch direct-message dispatch engine
//!
//! sendr walks an ordered recipient list, derives a per-group variant of a
//! base message so the destination site's duplicate-content check never sees
//! two byte-identical bodies, submits each message through an abstract
//! delivery channel, and rewrites a status file after every attempt so an
//! external dashboard can poll live progress.

pub mod batch;
pub mod channel;
pub mod classify;
pub mod domain;
pub mod error;
pub mod mutate;
pub mod runner;
pub mod store;

pub use error::{Result, SendrError};
