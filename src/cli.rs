use crate::endpoint::HttpRunEndpoint;
use crate::input_mode::InputModeController;
use crate::model::{CvFile, JobSource, RunConfig, RunEvent, RunOptions, TabKey};
use crate::orchestrator::{process_run_completion, RunOrchestrator, SubmitOutcome};
use crate::validate::FormState;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "tailor-pack-cli",
    version,
    about = "Send a CV and a job description to JobTailor and preview the tailor pack"
)]
pub struct Cli {
    /// Base URL of the JobTailor service
    #[arg(long, env = "JOBTAILOR_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// CV document to tailor (PDF, Markdown, or text)
    #[arg(long)]
    pub cv: Option<PathBuf>,

    /// Job posting URL
    #[arg(long, conflicts_with_all = ["job_text", "job_text_file"])]
    pub job_url: Option<String>,

    /// Job description text
    #[arg(long, conflicts_with = "job_text_file")]
    pub job_text: Option<String>,

    /// Read the job description text from a file
    #[arg(long)]
    pub job_text_file: Option<PathBuf>,

    /// Do not generate a cover letter
    #[arg(long)]
    pub no_cover_letter: bool,

    /// Do not render PDFs
    #[arg(long)]
    pub no_pdf: bool,

    /// Keep intermediate debug artifacts on the server
    #[arg(long)]
    pub debug_artifacts: bool,

    /// Ask the service to keep its own logging quiet
    #[arg(long)]
    pub quiet: bool,

    /// Run the pipeline without calling the language model
    #[arg(long)]
    pub dry_run: bool,

    /// Model used by the service
    #[arg(long, env = "JOBTAILOR_MODEL", default_value = "gpt-5-mini")]
    pub model: String,

    /// Sampling temperature, passed through as text
    #[arg(long, env = "JOBTAILOR_TEMPERATURE", default_value = "0.2")]
    pub temperature: String,

    /// Interval between progress animation ticks
    #[arg(long, default_value = "350ms")]
    pub tick_interval: humantime::Duration,

    /// Preview printed in text mode (cv, cover, audit)
    #[arg(long, default_value = "cv")]
    pub tab: TabKey,

    /// Print the run record as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except errors (for scripts)
    #[arg(long)]
    pub silent: bool,

    /// Check that the service is up and exit
    #[arg(long)]
    pub health: bool,

    /// Download produced files into the user's download directory
    #[arg(long)]
    pub download: bool,

    /// Download produced files into this directory
    #[arg(long)]
    pub download_dir: Option<PathBuf>,

    /// Export the run record as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Log level for this crate (overridden by RUST_LOG)
    #[arg(long, env = "JOBTAILOR_LOG", default_value = "info")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    fn is_tui(&self) -> bool {
        cfg!(feature = "tui") && !(self.json || self.text || self.silent || self.health)
    }
}

fn init_logging(args: &Cli) -> Result<()> {
    let level = if args.silent { "error" } else { args.log_level.as_str() };
    match args.log_file.clone() {
        Some(path) => crate::logging::init(level, Some(&path)),
        // The TUI owns the terminal; log to a file or not at all.
        None if args.is_tui() => match crate::logging::default_log_file() {
            Some(path) => crate::logging::init(level, Some(&path)),
            None => Ok(()),
        },
        None => crate::logging::init(level, None),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    // Validate that --silent can only be used with --json
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }
    init_logging(&args)?;
    tracing::debug!(base_url = %args.base_url, "starting");

    if args.health {
        return run_health(&args).await;
    }

    // Silent mode takes precedence over other output modes
    if args.silent {
        return run_once(args, OutputMode::Silent).await;
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args, OutputMode::Text).await;
        }
    }

    if args.json {
        return run_once(args, OutputMode::Json).await;
    }

    run_once(args, OutputMode::Text).await
}

/// `<downloads>/jobtailor`, or `./jobtailor` when the platform has no download directory.
fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| {
            tracing::warn!("no download directory on this platform; using the current directory");
            PathBuf::from(".")
        })
        .join("jobtailor")
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    let download_dir = args
        .download_dir
        .clone()
        .or_else(|| args.download.then(default_download_dir));
    RunConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("tailor-pack-cli/{}", env!("CARGO_PKG_VERSION")),
        tick_interval: Duration::from(args.tick_interval),
        download_dir,
    }
}

pub fn build_options(args: &Cli) -> RunOptions {
    RunOptions {
        include_cover_letter: !args.no_cover_letter,
        make_pdf: !args.no_pdf,
        debug_artifacts: args.debug_artifacts,
        quiet: args.quiet,
        dry_run: args.dry_run,
        model: args.model.clone(),
        temperature: args.temperature.clone(),
    }
}

/// Capture the form from CLI arguments. Missing pieces are left empty for the validator.
pub async fn form_from_args(args: &Cli) -> Result<FormState> {
    let cv_file = match args.cv.as_deref() {
        Some(path) => Some(CvFile::load(path).await?),
        None => None,
    };

    let mut inputs = InputModeController::new();
    let job_text = match args.job_text_file.as_deref() {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read job description {}", path.display()))?,
        ),
        None => args.job_text.clone(),
    };
    match (job_text, args.job_url.as_deref()) {
        (Some(text), _) => {
            inputs.set_mode(JobSource::Text);
            inputs.edit_active(text);
        }
        (None, Some(url)) => inputs.edit_active(url),
        (None, None) => {}
    }

    Ok(FormState {
        cv_file,
        inputs,
        options: build_options(args),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Text,
    Json,
    Silent,
}

fn report_event(out: Option<&mpsc::UnboundedSender<OutputLine>>, mode: OutputMode, ev: RunEvent) {
    let Some(out) = out else { return };
    if mode != OutputMode::Text {
        return;
    }
    let line = match ev {
        RunEvent::Started => "== Tailoring... ==".to_string(),
        RunEvent::StageReached { index, label } => {
            format!("[{}/{}] {label}", index + 1, crate::progress::STAGES.len())
        }
        RunEvent::Finished { label } => format!("== {label} =="),
        RunEvent::Info(msg) => msg,
        // Progress ticks are too chatty for a log; errors are reported by the caller.
        RunEvent::Progress { .. } | RunEvent::Error { .. } | RunEvent::Completed { .. } => return,
    };
    let _ = out.send(OutputLine::Stderr(line));
}

async fn run_health(args: &Cli) -> Result<()> {
    let cfg = build_config(args);
    let endpoint = HttpRunEndpoint::new(&cfg)?;
    if endpoint.health().await? {
        println!("{} is healthy", cfg.base_url);
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} did not report a healthy status", cfg.base_url))
    }
}

/// Submit once, stream progress, and print the outcome in the requested format.
async fn run_once(args: Cli, mode: OutputMode) -> Result<()> {
    let cfg = build_config(&args);
    let form = form_from_args(&args).await?;
    let endpoint = Arc::new(HttpRunEndpoint::new(&cfg)?);
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<RunEvent>();
    let orchestrator = RunOrchestrator::with_events(endpoint.clone(), cfg.tick_interval, evt_tx);

    let (out_tx, out_handle) = if mode == OutputMode::Silent {
        (None, None)
    } else {
        let (tx, handle) = spawn_output_writer();
        (Some(tx), Some(handle))
    };

    let outcome = {
        let submit = orchestrator.submit(&form);
        tokio::pin!(submit);
        loop {
            tokio::select! {
                outcome = &mut submit => break outcome,
                Some(ev) = evt_rx.recv() => report_event(out_tx.as_ref(), mode, ev),
            }
        }
    };
    while let Ok(ev) = evt_rx.try_recv() {
        report_event(out_tx.as_ref(), mode, ev);
    }

    let view = orchestrator.snapshot();
    let res = match outcome {
        SubmitOutcome::Succeeded(result) => {
            let processed = process_run_completion(
                &endpoint,
                &cfg.base_url,
                form.inputs.mode(),
                &result,
                &view.results,
                cfg.download_dir.as_deref(),
                args.export_json.as_deref(),
            )
            .await;

            if let Some(tx) = out_tx.as_ref() {
                for msg in &processed.messages {
                    let _ = tx.send(OutputLine::Stderr(msg.clone()));
                }
                if mode == OutputMode::Json {
                    let out = serde_json::to_string_pretty(&processed.record)?;
                    let _ = tx.send(OutputLine::Stdout(out));
                } else {
                    let summary =
                        crate::text_summary::build_text_summary(&view, &processed.record, args.tab);
                    for line in summary.lines {
                        let _ = tx.send(OutputLine::Stdout(line));
                    }
                }
            }
            Ok(())
        }
        SubmitOutcome::Rejected(err) | SubmitOutcome::Failed(err) => Err(anyhow::Error::new(err)),
        SubmitOutcome::Busy => Err(anyhow::anyhow!("a run is already in progress")),
    };

    if let Some(tx) = out_tx {
        drop(tx);
    }
    if let Some(handle) = out_handle {
        let _ = handle.await;
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["tailor-pack-cli"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn flags_map_to_options() {
        let args = parse(&["--no-pdf", "--dry-run", "--model", "gpt-5"]);
        let opts = build_options(&args);
        assert!(opts.include_cover_letter);
        assert!(!opts.make_pdf);
        assert!(opts.dry_run);
        assert_eq!(opts.model, "gpt-5");
    }

    #[test]
    fn job_url_conflicts_with_text() {
        let res = Cli::try_parse_from([
            "tailor-pack-cli",
            "--job-url",
            "https://example.com/job/1",
            "--job-text",
            "Analyst",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn tick_interval_and_tab_parse() {
        let args = parse(&["--tick-interval", "50ms", "--tab", "audit"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.tick_interval, Duration::from_millis(50));
        assert_eq!(args.tab, TabKey::Audit);
    }

    #[test]
    fn download_flag_always_yields_a_directory() {
        let cfg = build_config(&parse(&["--download"]));
        let dir = cfg.download_dir.unwrap();
        assert!(dir.ends_with("jobtailor"));

        let cfg = build_config(&parse(&["--download", "--download-dir", "/tmp/packs"]));
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/tmp/packs")));

        assert_eq!(build_config(&parse(&[])).download_dir, None);
    }

    #[tokio::test]
    async fn job_text_selects_text_mode() {
        let args = parse(&["--job-text", "  Quant analyst  "]);
        let form = form_from_args(&args).await.unwrap();
        assert_eq!(form.inputs.mode(), JobSource::Text);
        assert!(form.cv_file.is_none());
        assert_eq!(form.inputs.url().value, "");
    }

    #[tokio::test]
    async fn cv_file_is_loaded_with_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.md");
        std::fs::write(&path, "# Jane").unwrap();
        let args = parse(&[
            "--cv",
            path.to_str().unwrap(),
            "--job-url",
            "https://example.com/job/1",
        ]);
        let form = form_from_args(&args).await.unwrap();
        let cv = form.cv_file.unwrap();
        assert_eq!(cv.file_name, "resume.md");
        assert_eq!(&cv.bytes[..], b"# Jane");
        assert_eq!(form.inputs.active_value(), "https://example.com/job/1");
    }
}
