//! Post-run processing utilities.
//!
//! Builds the run record, downloads produced artifacts, and writes JSON exports after a
//! successful run.

use crate::endpoint::HttpRunEndpoint;
use crate::model::{JobSource, RunRecord, RunResult};
use crate::results::ResultList;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Result of post-run processing, ready for presentation layers.
pub struct ProcessedRun {
    pub record: RunRecord,
    pub messages: Vec<String>,
}

pub(crate) fn build_record(
    base_url: &str,
    job_source: JobSource,
    result: &RunResult,
    links: &ResultList,
) -> RunRecord {
    let resolved = links
        .resolve(base_url)
        .map(|urls| urls.into_iter().map(|u| u.to_string()).collect())
        .unwrap_or_else(|_| links.links().iter().map(|l| l.href.clone()).collect());
    RunRecord {
        timestamp_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        base_url: base_url.to_string(),
        job_source,
        links: resolved,
        downloaded: Vec::new(),
        result: result.clone(),
    }
}

/// Where an artifact lands under `dir`. Parent and root components of the server path are dropped
/// so a hostile path cannot escape the download directory.
pub fn artifact_destination(dir: &Path, server_path: &str) -> PathBuf {
    let mut dest = dir.to_path_buf();
    for component in Path::new(server_path).components() {
        if let Component::Normal(part) = component {
            dest.push(part);
        }
    }
    dest
}

pub(crate) async fn download_artifacts(
    endpoint: &HttpRunEndpoint,
    base_url: &str,
    links: &ResultList,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    let urls = links.resolve(base_url)?;
    let mut saved = Vec::with_capacity(urls.len());
    for (link, url) in links.links().iter().zip(urls) {
        let dest = artifact_destination(dir, &link.label);
        let body = endpoint.fetch_artifact(url).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        tokio::fs::write(&dest, &body)
            .await
            .with_context(|| format!("write {}", dest.display()))?;
        tracing::info!(path = %dest.display(), bytes = body.len(), "artifact saved");
        saved.push(dest);
    }
    Ok(saved)
}

pub fn export_record(path: &Path, record: &RunRecord) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

/// Process a successful run: build its record, download artifacts, export JSON.
///
/// Download and export failures are reported as messages; the run itself already succeeded.
pub(crate) async fn process_run_completion(
    endpoint: &HttpRunEndpoint,
    base_url: &str,
    job_source: JobSource,
    result: &RunResult,
    links: &ResultList,
    download_dir: Option<&Path>,
    export_json: Option<&Path>,
) -> ProcessedRun {
    let mut record = build_record(base_url, job_source, result, links);
    let mut messages = Vec::new();

    if let Some(dir) = download_dir {
        match download_artifacts(endpoint, base_url, links, dir).await {
            Ok(paths) => {
                messages.push(format!("Downloaded {} file(s) to {}", paths.len(), dir.display()));
                record.downloaded = paths;
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "artifact download failed");
                messages.push(format!("Download failed: {e:#}"));
            }
        }
    }

    if let Some(path) = export_json {
        match export_record(path, &record) {
            Ok(()) => messages.push(format!("Exported JSON: {}", path.display())),
            Err(e) => messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    ProcessedRun { record, messages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;

    fn ok_result(files: &[&str]) -> RunResult {
        RunResult {
            status: RunStatus::Ok,
            message: None,
            preview: None,
            created_files: files.iter().map(|f| f.to_string()).collect(),
            output_dir: None,
        }
    }

    #[test]
    fn destination_stays_inside_dir() {
        let dir = Path::new("/tmp/pack");
        assert_eq!(
            artifact_destination(dir, "../../etc/passwd"),
            PathBuf::from("/tmp/pack/etc/passwd")
        );
        assert_eq!(
            artifact_destination(dir, "/outputs/ui_runs/a_cv.md"),
            PathBuf::from("/tmp/pack/outputs/ui_runs/a_cv.md")
        );
    }

    #[test]
    fn record_links_are_absolute() {
        let result = ok_result(&["out/cv.pdf"]);
        let mut links = ResultList::default();
        links.render(&result.created_files);
        let record = build_record("http://127.0.0.1:8000", JobSource::Url, &result, &links);
        assert_eq!(record.links, vec!["http://127.0.0.1:8000/out/cv.pdf"]);
        assert!(record.downloaded.is_empty());
    }

    #[test]
    fn export_writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.json");
        let result = ok_result(&[]);
        let record = build_record("http://localhost:8000", JobSource::Text, &result, &ResultList::default());
        export_record(&path, &record).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: RunRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.job_source, JobSource::Text);
        assert_eq!(back.result.status, RunStatus::Ok);
    }
}
