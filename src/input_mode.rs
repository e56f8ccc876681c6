//! Job source switching between a URL and a pasted description.

use crate::model::JobSource;

pub const URL_PLACEHOLDER: &str = "https://www.linkedin.com/jobs/view/...";
pub const TEXT_PLACEHOLDER: &str = "Paste the job description here";

/// A single input box as the user sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputField {
    pub value: String,
    pub enabled: bool,
    pub placeholder: String,
}

/// Keeps exactly one of the two job inputs editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputModeController {
    mode: JobSource,
    url: InputField,
    text: InputField,
}

impl Default for InputModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl InputModeController {
    pub fn new() -> Self {
        let mut ctl = Self {
            mode: JobSource::Url,
            url: InputField::default(),
            text: InputField::default(),
        };
        ctl.set_mode(JobSource::Url);
        ctl
    }

    pub fn mode(&self) -> JobSource {
        self.mode
    }

    pub fn url(&self) -> &InputField {
        &self.url
    }

    pub fn text(&self) -> &InputField {
        &self.text
    }

    /// Activate `mode`: the other input is cleared and disabled, the active one gets its hint.
    pub fn set_mode(&mut self, mode: JobSource) {
        self.mode = mode;
        let (active, inactive, hint) = match mode {
            JobSource::Url => (&mut self.url, &mut self.text, URL_PLACEHOLDER),
            JobSource::Text => (&mut self.text, &mut self.url, TEXT_PLACEHOLDER),
        };
        inactive.value.clear();
        inactive.enabled = false;
        active.enabled = true;
        active.placeholder = hint.to_string();
        tracing::debug!(mode = %mode, "job source switched");
    }

    /// Replace the value of the editable input. Disabled inputs never change.
    pub fn edit_active(&mut self, value: impl Into<String>) {
        self.active_mut().value = value.into();
    }

    pub fn push_char(&mut self, c: char) {
        self.active_mut().value.push(c);
    }

    pub fn push_str(&mut self, s: &str) {
        self.active_mut().value.push_str(s);
    }

    pub fn pop_char(&mut self) {
        self.active_mut().value.pop();
    }

    pub fn active(&self) -> &InputField {
        match self.mode {
            JobSource::Url => &self.url,
            JobSource::Text => &self.text,
        }
    }

    pub fn active_value(&self) -> &str {
        &self.active().value
    }

    fn active_mut(&mut self) -> &mut InputField {
        match self.mode {
            JobSource::Url => &mut self.url,
            JobSource::Text => &mut self.text,
        }
    }
}
