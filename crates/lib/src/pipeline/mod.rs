//! Staged pipeline execution.
//!
//! A run is an ordered list of [`PipelineStage`]s. Each stage gets its own
//! `<stage>.log` (except the `no-logging` sentinel stage) and runs its steps
//! one at a time. Any nonzero exit or launch failure aborts the whole run;
//! there is no retry and no resume.

pub mod command;
pub mod log;
pub mod runner;
pub mod types;

pub use log::StageLog;
pub use runner::PipelineRunner;
pub use types::{CommandSpec, PipelineError, PipelineStage, RunState, StageRecord, Step};
