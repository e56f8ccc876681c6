//! Session controller.
//!
//! Receives commands from the UI thread, drives the orchestrator, and emits events for
//! presentation layers.

use super::post_process::process_run_completion;
use super::run::{RunOrchestrator, SubmitOutcome};
use crate::endpoint::HttpRunEndpoint;
use crate::model::{JobSource, RunConfig, RunEvent};
use crate::validate::FormState;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub(crate) const BUSY_NOTICE: &str = "A run is already in progress.";

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Submit(Box<FormState>),
    Quit,
}

/// Handle for the run currently in flight.
struct RunCtx {
    job_source: JobSource,
    handle: Option<tokio::task::JoinHandle<SubmitOutcome>>,
}

fn start_run(orchestrator: &RunOrchestrator, form: FormState) -> RunCtx {
    let job_source = form.inputs.mode();
    let orchestrator = orchestrator.clone();
    let handle = tokio::spawn(async move { orchestrator.submit(&form).await });
    RunCtx {
        job_source,
        handle: Some(handle),
    }
}

/// Route UI commands to the orchestrator until the UI quits.
pub(crate) async fn run_controller(
    cfg: &RunConfig,
    endpoint: Arc<HttpRunEndpoint>,
    orchestrator: RunOrchestrator,
    export_json: Option<PathBuf>,
    event_tx: UnboundedSender<RunEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut run_ctx: Option<RunCtx> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(form)) => {
                        if run_ctx.is_some() {
                            tracing::debug!("submit ignored: a run is already in flight");
                            let _ = event_tx.send(RunEvent::Info(BUSY_NOTICE.into()));
                        } else {
                            run_ctx = Some(start_run(&orchestrator, *form));
                        }
                    }
                    Some(UiCommand::Quit) | None => {
                        // The endpoint offers no cancellation; the in-flight request is dropped.
                        if let Some(mut ctx) = run_ctx.take() {
                            if let Some(h) = ctx.handle.take() {
                                h.abort();
                            }
                        }
                        break Ok(());
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut run_ctx {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                let Some(join_res) = maybe_done else { continue };
                let job_source = run_ctx.take().map(|c| c.job_source).unwrap_or_default();
                match join_res {
                    Ok(SubmitOutcome::Succeeded(result)) => {
                        let links = orchestrator.snapshot().results;
                        let processed = process_run_completion(
                            &endpoint,
                            &cfg.base_url,
                            job_source,
                            &result,
                            &links,
                            cfg.download_dir.as_deref(),
                            export_json.as_deref(),
                        )
                        .await;
                        for msg in processed.messages {
                            let _ = event_tx.send(RunEvent::Info(msg));
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "run task join failed");
                        let _ = event_tx.send(RunEvent::Info(format!("Run join failed: {e}")));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CvFile, RunLifecycle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    type Routes = &'static [(&'static str, &'static str)];

    async fn read_request(sock: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = sock.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            assert!(n > 0, "connection closed before headers");
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    async fn answer(mut sock: TcpStream, routes: Routes, run_hits: Arc<AtomicUsize>) {
        let request = read_request(&mut sock).await;
        let path = request.split_whitespace().nth(1).unwrap_or_default().to_string();
        if path == "/api/run" {
            run_hits.fetch_add(1, Ordering::SeqCst);
        }
        // Unknown paths never get an answer.
        let Some((_, body)) = routes.iter().find(|(p, _)| *p == path) else {
            return futures::future::pending().await;
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
    }

    /// Local service answering `routes`; returns its base URL and the `/api/run` hit counter.
    async fn spawn_service(routes: Routes) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let run_hits = Arc::new(AtomicUsize::new(0));
        let hits = run_hits.clone();
        tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                tokio::spawn(answer(sock, routes, hits.clone()));
            }
        });
        (base, run_hits)
    }

    fn form() -> FormState {
        let mut form = FormState {
            cv_file: Some(CvFile::new("resume.md", &b"# Jane"[..])),
            ..Default::default()
        };
        form.inputs.edit_active("https://example.com/job/1");
        form
    }

    struct Harness {
        cmd_tx: UnboundedSender<UiCommand>,
        event_rx: UnboundedReceiver<RunEvent>,
        orchestrator: RunOrchestrator,
        task: JoinHandle<Result<()>>,
    }

    impl Harness {
        fn start(base: &str, download_dir: Option<PathBuf>, export_json: Option<PathBuf>) -> Self {
            let cfg = RunConfig {
                base_url: base.to_string(),
                user_agent: "tailor-pack-cli/test".into(),
                tick_interval: Duration::from_millis(350),
                download_dir,
            };
            let endpoint = Arc::new(HttpRunEndpoint::new(&cfg).unwrap());
            let (event_tx, event_rx) = mpsc::unbounded_channel();
            let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
            let orchestrator =
                RunOrchestrator::with_events(endpoint.clone(), cfg.tick_interval, event_tx.clone());
            let orch = orchestrator.clone();
            let task = tokio::spawn(async move {
                run_controller(&cfg, endpoint, orch, export_json, event_tx, cmd_rx).await
            });
            Self {
                cmd_tx,
                event_rx,
                orchestrator,
                task,
            }
        }

        fn submit(&self) {
            self.cmd_tx.send(UiCommand::Submit(Box::new(form()))).unwrap();
        }

        /// Collect info lines until `done` accepts one.
        async fn infos_until(&mut self, done: impl Fn(&str) -> bool) -> Vec<String> {
            let mut infos = Vec::new();
            loop {
                let ev = tokio::time::timeout(Duration::from_secs(10), self.event_rx.recv())
                    .await
                    .expect("timed out waiting for events")
                    .expect("event channel closed");
                if let RunEvent::Info(msg) = ev {
                    let finished = done(&msg);
                    infos.push(msg);
                    if finished {
                        return infos;
                    }
                }
            }
        }

        async fn quit(self) -> Result<()> {
            self.cmd_tx.send(UiCommand::Quit).unwrap();
            tokio::time::timeout(Duration::from_secs(5), self.task)
                .await
                .expect("controller did not stop")
                .unwrap()
        }
    }

    const OK_RUN: &str = r#"{"status":"ok","created_files":["out/cv.md"]}"#;

    #[tokio::test]
    async fn second_submit_reports_busy_and_first_run_is_exported() {
        static ROUTES: Routes = &[("/api/run", OK_RUN)];
        let (base, run_hits) = spawn_service(ROUTES).await;
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("run.json");
        let mut h = Harness::start(&base, None, Some(export.clone()));

        h.submit();
        h.submit();
        let infos = h.infos_until(|m| m.starts_with("Exported JSON")).await;

        assert!(infos.iter().any(|m| m == BUSY_NOTICE), "{infos:?}");
        assert_eq!(run_hits.load(Ordering::SeqCst), 1);
        assert!(export.exists());
        assert_eq!(h.orchestrator.snapshot().dispatched, 1);
        h.quit().await.unwrap();
    }

    #[tokio::test]
    async fn quit_returns_while_the_request_hangs() {
        static ROUTES: Routes = &[];
        let (base, run_hits) = spawn_service(ROUTES).await;
        let h = Harness::start(&base, None, None);

        h.submit();
        while run_hits.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.orchestrator.lifecycle(), RunLifecycle::Running);

        h.quit().await.unwrap();
        assert_eq!(run_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_run_downloads_artifacts() {
        static ROUTES: Routes = &[("/api/run", OK_RUN), ("/out/cv.md", "# Tailored")];
        let (base, _) = spawn_service(ROUTES).await;
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::start(&base, Some(dir.path().to_path_buf()), None);

        h.submit();
        let infos = h.infos_until(|m| m.starts_with("Download")).await;

        assert!(infos.last().unwrap().starts_with("Downloaded 1 file(s)"), "{infos:?}");
        let saved = std::fs::read_to_string(dir.path().join("out").join("cv.md")).unwrap();
        assert_eq!(saved, "# Tailored");
        h.quit().await.unwrap();
    }
}
