use crate::model::{JobSource, RunEvent};
use crate::orchestrator::{UiCommand, BUSY_NOTICE};
use crate::validate::FormState;

/// State owned by the UI thread. Run state lives in the orchestrator and is read as snapshots.
pub struct UiState {
    pub form: FormState,
    pub info: String,
    pub show_help: bool,
}

impl UiState {
    pub fn new(form: FormState) -> Self {
        Self {
            form,
            info: "Ctrl-U job URL · Ctrl-T job text · Enter run · F10 help".to_string(),
            show_help: false,
        }
    }

    pub fn set_mode(&mut self, mode: JobSource) {
        self.form.inputs.set_mode(mode);
        self.info = match mode {
            JobSource::Url => "Job source: URL".into(),
            JobSource::Text => "Job source: pasted text".into(),
        };
    }

    /// Build a submit command, or `None` while the run button is disabled.
    pub fn request_submit(&mut self, button_enabled: bool) -> Option<UiCommand> {
        if !button_enabled {
            self.info = BUSY_NOTICE.to_string();
            return None;
        }
        Some(UiCommand::Submit(Box::new(self.form.clone())))
    }

    /// Newline in the job description; URL input is single-line.
    pub fn insert_newline(&mut self) {
        if self.form.inputs.mode() == JobSource::Text {
            self.form.inputs.push_char('\n');
        }
    }

    /// Fold a run event into the status line.
    pub fn apply_event(&mut self, ev: RunEvent) {
        match ev {
            RunEvent::Started => self.info = "Tailoring...".into(),
            RunEvent::Info(msg) => self.info = msg,
            RunEvent::Error { message } => self.info = format!("Error: {message}"),
            RunEvent::Completed { result } => {
                self.info = format!("Tailor pack ready: {} file(s)", result.created_files.len());
            }
            RunEvent::Progress { .. } | RunEvent::StageReached { .. } | RunEvent::Finished { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunResult, RunStatus};

    #[test]
    fn completion_reports_file_count() {
        let mut state = UiState::new(FormState::default());
        state.apply_event(RunEvent::Completed {
            result: Box::new(RunResult {
                status: RunStatus::Ok,
                message: None,
                preview: None,
                created_files: vec!["out/cv.pdf".into(), "out/cover.pdf".into()],
                output_dir: None,
            }),
        });
        assert_eq!(state.info, "Tailor pack ready: 2 file(s)");
    }

    #[test]
    fn submit_is_withheld_while_running() {
        let mut state = UiState::new(FormState::default());
        assert!(state.request_submit(false).is_none());
        assert_eq!(state.info, BUSY_NOTICE);
        assert!(matches!(
            state.request_submit(true),
            Some(UiCommand::Submit(_))
        ));
    }

    #[test]
    fn newline_only_goes_into_job_text() {
        let mut state = UiState::new(FormState::default());
        state.form.inputs.push_str("https://example.com/job/1");
        state.insert_newline();
        assert_eq!(state.form.inputs.url().value, "https://example.com/job/1");

        state.set_mode(JobSource::Text);
        state.form.inputs.push_str("Role");
        state.insert_newline();
        state.form.inputs.push_str("Python");
        assert_eq!(state.form.inputs.text().value, "Role\nPython");
    }

    #[test]
    fn mode_switch_updates_form() {
        let mut state = UiState::new(FormState::default());
        state.form.inputs.push_str("https://example.com/job/1");
        state.set_mode(JobSource::Text);
        assert_eq!(state.form.inputs.url().value, "");
        assert!(state.form.inputs.text().enabled);
    }
}
