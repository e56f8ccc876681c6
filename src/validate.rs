use crate::error::ValidationError;
use crate::input_mode::InputModeController;
use crate::model::{CvFile, JobSource, RunOptions, RunRequest};

/// Client-side state captured from the form at the moment the user presses run.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub cv_file: Option<CvFile>,
    pub inputs: InputModeController,
    pub options: RunOptions,
}

impl FormState {
    /// Label shown next to the CV picker.
    pub fn cv_label(&self) -> &str {
        match &self.cv_file {
            Some(f) => &f.file_name,
            None => "PDF, Markdown, or text accepted",
        }
    }

    /// Build the request payload. Returns `None` when no CV is selected.
    pub fn to_request(&self) -> Option<RunRequest> {
        let cv_file = self.cv_file.clone()?;
        Some(RunRequest {
            cv_file,
            job_source: self.inputs.mode(),
            job_url: self.inputs.url().value.trim().to_string(),
            job_text: self.inputs.text().value.trim().to_string(),
            include_cover_letter: self.options.include_cover_letter,
            make_pdf: self.options.make_pdf,
            debug_artifacts: self.options.debug_artifacts,
            quiet: self.options.quiet,
            dry_run: self.options.dry_run,
            model: self.options.model.trim().to_string(),
            temperature: self.options.temperature.trim().to_string(),
        })
    }
}

/// Presence checks, first failing rule wins.
pub fn validate(state: &FormState) -> Result<(), ValidationError> {
    if state.cv_file.is_none() {
        return Err(ValidationError::MissingCvFile);
    }
    match state.inputs.mode() {
        JobSource::Url if state.inputs.url().value.trim().is_empty() => {
            Err(ValidationError::MissingJobUrl)
        }
        JobSource::Text if state.inputs.text().value.trim().is_empty() => {
            Err(ValidationError::MissingJobText)
        }
        _ => Ok(()),
    }
}
