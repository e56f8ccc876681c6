use crate::model::TabKey;
use std::collections::BTreeMap;

const PLACEHOLDER_CV: &str = "SUMMARY\nData-driven analyst with 6+ years building revenue intelligence and automation.\n\nCORE SKILLS\nPython, SQL, LLM pipelines, ATS optimization, analytics.\n\nIMPACT\n- Reframed accomplishments into ATS-friendly outcomes (+32% recruiter callbacks).\n- Automated tailoring workflow for multi-role applications.";

const PLACEHOLDER_COVER: &str = "Dear Hiring Manager,\n\nI'm excited to apply for the Quantitative Analyst role. JobTailor highlights my work in risk modeling, portfolio research, and client-ready storytelling.\n\nHighlights\n- Built factor models in Python + SQL across 120k+ rows.\n- Presented insights for executive decision making.\n\nBest regards,\nRene Jean-Marie";

const PLACEHOLDER_AUDIT: &str = "ATS CHECKLIST\n- 92% keyword alignment\n- Clean section headers (Summary, Skills, Experience)\n- Action verbs tuned to role description\n- Removed ambiguous statements\n- Added quant metrics where possible";

pub fn placeholder(key: TabKey) -> &'static str {
    match key {
        TabKey::Cv => PLACEHOLDER_CV,
        TabKey::Cover => PLACEHOLDER_COVER,
        TabKey::Audit => PLACEHOLDER_AUDIT,
    }
}

/// The three previewable documents and which one is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewStore {
    documents: BTreeMap<TabKey, String>,
    active: TabKey,
    rendered: String,
}

impl Default for PreviewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewStore {
    pub fn new() -> Self {
        let documents = TabKey::ALL
            .iter()
            .map(|k| (*k, placeholder(*k).to_string()))
            .collect();
        let mut store = Self {
            documents,
            active: TabKey::Cv,
            rendered: String::new(),
        };
        store.render();
        store
    }

    pub fn active_tab(&self) -> TabKey {
        self.active
    }

    pub fn document(&self, key: TabKey) -> &str {
        self.documents
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| placeholder(key))
    }

    /// The text currently on display.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    /// Overwrite `key` with `value` unless it is empty. Returns whether the document changed.
    pub fn set_document(&mut self, key: TabKey, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        self.documents.insert(key, value.to_string());
        if self.active == key {
            self.render();
        }
        true
    }

    pub fn select_tab(&mut self, key: TabKey) {
        self.active = key;
        self.render();
    }

    fn render(&mut self) {
        self.rendered = self.document(self.active).to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_cv_placeholder() {
        let store = PreviewStore::new();
        assert_eq!(store.active_tab(), TabKey::Cv);
        assert_eq!(store.rendered(), placeholder(TabKey::Cv));
        for key in TabKey::ALL {
            assert!(!store.document(key).is_empty());
        }
    }

    #[test]
    fn empty_value_never_overwrites() {
        let mut store = PreviewStore::new();
        assert!(!store.set_document(TabKey::Cover, ""));
        assert_eq!(store.document(TabKey::Cover), placeholder(TabKey::Cover));
    }

    #[test]
    fn writing_the_active_tab_rerenders() {
        let mut store = PreviewStore::new();
        store.select_tab(TabKey::Audit);
        store.set_document(TabKey::Audit, "ATS AUDIT\n- ok");
        assert_eq!(store.rendered(), "ATS AUDIT\n- ok");

        store.set_document(TabKey::Cv, "New CV");
        assert_eq!(store.rendered(), "ATS AUDIT\n- ok");
        store.select_tab(TabKey::Cv);
        assert_eq!(store.rendered(), "New CV");
    }
}
