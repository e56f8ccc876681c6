//! Application-level orchestration.
//!
//! This module owns the run lifecycle (validation, dispatch, progress, result handling) and
//! post-run processing such as artifact download and JSON export. UI/CLI layers call into
//! this module to keep responsibilities separated.

#[cfg(feature = "tui")]
mod controller;
mod post_process;
mod run;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand, BUSY_NOTICE};
pub use post_process::{artifact_destination, export_record, ProcessedRun};
pub(crate) use post_process::process_run_completion;
pub use run::{
    RunOrchestrator, SessionView, SubmitButton, SubmitOutcome, AGAIN_BUTTON_LABEL,
    FAILURE_LABEL, IDLE_BUTTON_LABEL, RUNNING_BUTTON_LABEL, SUCCESS_LABEL,
};
