use anyhow::{Context, Result};
use reqwest::Url;

/// One produced artifact, exposed as a link relative to the service root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLink {
    pub label: String,
    pub href: String,
    /// Links open in a new context (browser tab, external viewer) rather than replacing the UI.
    pub new_context: bool,
}

impl ResultLink {
    fn from_path(path: &str) -> Self {
        Self {
            label: path.to_string(),
            href: format!("/{}", path.trim_start_matches('/')),
            new_context: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultList {
    links: Vec<ResultLink>,
}

impl ResultList {
    /// Replace the whole list, one link per path, keeping order.
    pub fn render(&mut self, paths: &[String]) {
        self.links = paths.iter().map(|p| ResultLink::from_path(p)).collect();
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }

    pub fn links(&self) -> &[ResultLink] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Absolute URLs of every link on the service at `base`.
    pub fn resolve(&self, base: &str) -> Result<Vec<Url>> {
        let base = Url::parse(base).with_context(|| format!("invalid service URL {base}"))?;
        self.links
            .iter()
            .map(|l| {
                base.join(&l.href)
                    .with_context(|| format!("cannot resolve {}", l.href))
            })
            .collect()
    }
}
