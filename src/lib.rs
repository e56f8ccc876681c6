//! Terminal client for the JobTailor tailoring service.
//!
//! A run sends a CV and a job description (URL or pasted text) to the service, animates staged
//! progress while the request is outstanding, then exposes the generated résumé, cover letter
//! and ATS audit as tabbed previews plus links to the produced files.

pub mod cli;
pub mod endpoint;
pub mod error;
pub mod input_mode;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod preview;
pub mod progress;
pub mod results;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
pub mod validate;
