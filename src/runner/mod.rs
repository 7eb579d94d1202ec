//! Dispatch loop - the single stateful orchestrator.

mod dispatcher;

pub use dispatcher::{
    Dispatcher, Pacing, RunContext, RunOutcome, RunParams, RunSummary, SequenceMode,
};
