use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Snapshot of settings used by a session, built once from CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    pub user_agent: String,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    #[serde(default)]
    pub download_dir: Option<std::path::PathBuf>,
}

/// Where the job description comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    #[default]
    Url,
    Text,
}

impl JobSource {
    pub fn as_str(self) -> &'static str {
        match self {
            JobSource::Url => "url",
            JobSource::Text => "text",
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three generated documents shown in the preview pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKey {
    Cv,
    Cover,
    Audit,
}

impl TabKey {
    pub const ALL: [TabKey; 3] = [TabKey::Cv, TabKey::Cover, TabKey::Audit];

    pub fn as_str(self) -> &'static str {
        match self {
            TabKey::Cv => "cv",
            TabKey::Cover => "cover",
            TabKey::Audit => "audit",
        }
    }

    /// Title shown on the tab itself.
    pub fn title(self) -> &'static str {
        match self {
            TabKey::Cv => "Résumé",
            TabKey::Cover => "Cover letter",
            TabKey::Audit => "ATS audit",
        }
    }

    pub fn index(self) -> usize {
        match self {
            TabKey::Cv => 0,
            TabKey::Cover => 1,
            TabKey::Audit => 2,
        }
    }

    pub fn next(self) -> TabKey {
        TabKey::ALL[(self.index() + 1) % TabKey::ALL.len()]
    }
}

impl FromStr for TabKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cv" | "resume" => Ok(TabKey::Cv),
            "cover" | "cover-letter" => Ok(TabKey::Cover),
            "audit" | "ats" => Ok(TabKey::Audit),
            other => Err(format!("unknown preview tab '{other}' (expected cv, cover or audit)")),
        }
    }
}

/// A CV document picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl CvFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read CV file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("cv.pdf")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

/// Run flags and generation settings sent alongside the documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    pub include_cover_letter: bool,
    pub make_pdf: bool,
    pub debug_artifacts: bool,
    pub quiet: bool,
    pub dry_run: bool,
    pub model: String,
    pub temperature: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            include_cover_letter: true,
            make_pdf: true,
            debug_artifacts: false,
            quiet: false,
            dry_run: false,
            model: "gpt-5-mini".to_string(),
            temperature: "0.2".to_string(),
        }
    }
}

/// Everything needed to dispatch one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub cv_file: CvFile,
    pub job_source: JobSource,
    pub job_url: String,
    pub job_text: String,
    pub include_cover_letter: bool,
    pub make_pdf: bool,
    pub debug_artifacts: bool,
    pub quiet: bool,
    pub dry_run: bool,
    pub model: String,
    pub temperature: String,
}

fn flag(value: bool) -> String {
    let literal = if value { "true" } else { "false" };
    literal.to_string()
}

impl RunRequest {
    /// Text fields of the multipart submission, in wire order. The CV file travels separately.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("job_source", self.job_source.as_str().to_string()),
            ("job_url", self.job_url.clone()),
            ("job_text", self.job_text.clone()),
            ("include_cover_letter", flag(self.include_cover_letter)),
            ("make_pdf", flag(self.make_pdf)),
            ("debug_artifacts", flag(self.debug_artifacts)),
            ("quiet", flag(self.quiet)),
            ("dry_run", flag(self.dry_run)),
            ("model", self.model.clone()),
            ("temperature", self.temperature.clone()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    #[serde(other)]
    Error,
}

/// Preview text for the generated documents. Missing keys deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewPayload {
    #[serde(default)]
    pub cv: String,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub audit: String,
}

impl PreviewPayload {
    pub fn get(&self, key: TabKey) -> &str {
        match key {
            TabKey::Cv => &self.cv,
            TabKey::Cover => &self.cover,
            TabKey::Audit => &self.audit,
        }
    }
}

/// Payload returned by the run endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewPayload>,
    #[serde(default)]
    pub created_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

impl RunResult {
    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }
}

/// Lifecycle of the single run owned by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunLifecycle {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Events emitted while a run progresses, consumed by the TUI and text layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunEvent {
    Started,
    Progress {
        percent: u8,
    },
    StageReached {
        index: usize,
        label: String,
    },
    Finished {
        label: String,
    },
    Error {
        message: String,
    },
    Completed {
        // Boxed so the enum stays small next to the frequent progress ticks.
        result: Box<RunResult>,
    },
    Info(String),
}

/// Persisted outcome of a successful run, used by `--json` and `--export-json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp_utc: String,
    pub base_url: String,
    pub job_source: JobSource,
    pub links: Vec<String>,
    #[serde(default)]
    pub downloaded: Vec<std::path::PathBuf>,
    pub result: RunResult,
}
