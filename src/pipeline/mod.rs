//! Trade pipeline: per-candidate state machine plus the single-slot
//! orchestrator that drives it from inbound messages.

pub mod orchestrator;
pub mod state;

pub use orchestrator::{Dispatch, Orchestrator, PipelineHandle, PipelineOutcome, RunSummary};
pub use state::{PipelineRun, PipelineState};
