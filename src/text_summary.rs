//! Text summary builder for CLI output.

use crate::model::{RunRecord, TabKey};
use crate::orchestrator::SessionView;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from the settled session and its run record.
pub(crate) fn build_text_summary(view: &SessionView, record: &RunRecord, tab: TabKey) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!("Status: {}", view.progress.label));
    lines.push(format!("Job source: {}", record.job_source));
    if let Some(dir) = record.result.output_dir.as_deref() {
        lines.push(format!("Output dir: {dir}"));
    }

    if record.links.is_empty() {
        lines.push("Created files: none".to_string());
    } else {
        lines.push(format!("Created files ({}):", record.links.len()));
        for link in &record.links {
            lines.push(format!("  {link}"));
        }
    }
    for path in &record.downloaded {
        lines.push(format!("Saved: {}", path.display()));
    }

    lines.push(String::new());
    lines.push(format!("── {} ──", tab.title()));
    lines.extend(view.previews.document(tab).lines().map(str::to_string));

    TextSummary { lines }
}
