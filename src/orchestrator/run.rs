//! Single-run lifecycle: validation, dispatch, progress, and result handling.

use crate::endpoint::RunEndpoint;
use crate::error::{RunError, RunErrorKind, ValidationError};
use crate::model::{RunEvent, RunLifecycle, RunResult, TabKey};
use crate::preview::PreviewStore;
use crate::progress::{ProgressAnimator, ProgressState};
use crate::results::ResultList;
use crate::validate::{validate, FormState};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

pub const IDLE_BUTTON_LABEL: &str = "Run JobTailor";
pub const RUNNING_BUTTON_LABEL: &str = "Tailoring...";
pub const AGAIN_BUTTON_LABEL: &str = "Tailor Again";
pub const SUCCESS_LABEL: &str = "Tailor pack ready";
pub const FAILURE_LABEL: &str = "Run failed";

/// The run affordance as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    pub label: String,
    pub enabled: bool,
}

impl Default for SubmitButton {
    fn default() -> Self {
        Self {
            label: IDLE_BUTTON_LABEL.to_string(),
            enabled: true,
        }
    }
}

/// Result of a call to [`RunOrchestrator::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A run was already in flight; nothing happened.
    Busy,
    /// Rejected locally before dispatch.
    Rejected(RunError),
    Succeeded(RunResult),
    Failed(RunError),
}

/// Read-only copy of everything a presentation layer draws.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub lifecycle: RunLifecycle,
    pub error: Option<String>,
    pub last_error_kind: Option<RunErrorKind>,
    pub button: SubmitButton,
    pub previews: PreviewStore,
    pub results: ResultList,
    pub progress: ProgressState,
    pub dispatched: u64,
}

struct Session {
    lifecycle: RunLifecycle,
    error: Option<String>,
    last_error_kind: Option<RunErrorKind>,
    button: SubmitButton,
    previews: PreviewStore,
    results: ResultList,
    animator: ProgressAnimator,
    dispatched: u64,
}

impl Session {
    fn show_error(&mut self, err: &RunError) {
        self.error = Some(err.banner());
        self.last_error_kind = Some(err.kind());
    }

    fn begin_run(&mut self) {
        self.lifecycle = RunLifecycle::Running;
        self.button = SubmitButton {
            label: RUNNING_BUTTON_LABEL.to_string(),
            enabled: false,
        };
        self.error = None;
        self.last_error_kind = None;
        self.results.clear();
        self.animator.reset();
        self.animator.start();
        self.dispatched += 1;
    }

    fn apply_success(&mut self, result: &RunResult) {
        self.animator.finish(SUCCESS_LABEL);
        if let Some(preview) = result.preview.as_ref() {
            for key in TabKey::ALL {
                self.previews.set_document(key, preview.get(key));
            }
        }
        self.results.render(&result.created_files);
        self.lifecycle = RunLifecycle::Succeeded;
    }

    fn apply_failure(&mut self, err: &RunError) {
        self.animator.finish(FAILURE_LABEL);
        self.show_error(err);
        self.lifecycle = RunLifecycle::Failed;
    }

    fn restore_button(&mut self) {
        self.button = SubmitButton {
            label: AGAIN_BUTTON_LABEL.to_string(),
            enabled: true,
        };
    }
}

/// Owns the run lifecycle for one session. Cloning shares the same session.
#[derive(Clone)]
pub struct RunOrchestrator {
    endpoint: Arc<dyn RunEndpoint>,
    session: Arc<Mutex<Session>>,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl RunOrchestrator {
    pub fn new(endpoint: Arc<dyn RunEndpoint>, tick_interval: Duration) -> Self {
        Self::build(endpoint, tick_interval, None)
    }

    pub fn with_events(
        endpoint: Arc<dyn RunEndpoint>,
        tick_interval: Duration,
        event_tx: UnboundedSender<RunEvent>,
    ) -> Self {
        Self::build(endpoint, tick_interval, Some(event_tx))
    }

    fn build(
        endpoint: Arc<dyn RunEndpoint>,
        tick_interval: Duration,
        event_tx: Option<UnboundedSender<RunEvent>>,
    ) -> Self {
        let mut animator = ProgressAnimator::new(tick_interval);
        if let Some(tx) = event_tx.clone() {
            animator = animator.with_events(tx);
        }
        let session = Session {
            lifecycle: RunLifecycle::Idle,
            error: None,
            last_error_kind: None,
            button: SubmitButton::default(),
            previews: PreviewStore::new(),
            results: ResultList::default(),
            animator,
            dispatched: 0,
        };
        Self {
            endpoint,
            session: Arc::new(Mutex::new(session)),
            event_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, ev: RunEvent) {
        if let Some(tx) = self.event_tx.as_ref() {
            let _ = tx.send(ev);
        }
    }

    pub fn lifecycle(&self) -> RunLifecycle {
        self.lock().lifecycle
    }

    pub fn snapshot(&self) -> SessionView {
        let s = self.lock();
        SessionView {
            lifecycle: s.lifecycle,
            error: s.error.clone(),
            last_error_kind: s.last_error_kind,
            button: s.button.clone(),
            previews: s.previews.clone(),
            results: s.results.clone(),
            progress: s.animator.snapshot(),
            dispatched: s.dispatched,
        }
    }

    /// Switch the visible preview. Never touches the run itself.
    pub fn select_tab(&self, key: TabKey) {
        self.lock().previews.select_tab(key);
    }

    /// Validate `form`, dispatch it, and settle the session once the endpoint answers.
    ///
    /// Single-flight: while a run is in flight further calls return [`SubmitOutcome::Busy`].
    pub async fn submit(&self, form: &FormState) -> SubmitOutcome {
        let request = {
            let mut s = self.lock();
            if s.lifecycle == RunLifecycle::Running {
                tracing::debug!("submit ignored: a run is already in flight");
                return SubmitOutcome::Busy;
            }
            s.error = None;
            s.last_error_kind = None;

            let checked = validate(form)
                .and_then(|()| form.to_request().ok_or(ValidationError::MissingCvFile));
            match checked {
                Ok(request) => {
                    s.begin_run();
                    request
                }
                Err(reason) => {
                    let err = RunError::from(reason);
                    tracing::info!(kind = ?err.kind(), reason = %err, "run rejected before dispatch");
                    s.show_error(&err);
                    s.lifecycle = RunLifecycle::Failed;
                    drop(s);
                    self.emit(RunEvent::Error {
                        message: err.banner(),
                    });
                    return SubmitOutcome::Rejected(err);
                }
            }
        };
        self.emit(RunEvent::Started);

        let outcome = self
            .endpoint
            .run(request)
            .await
            .and_then(|reply| reply.into_result());

        let mut s = self.lock();
        let outcome = match outcome {
            Ok(result) => {
                tracing::info!(files = result.created_files.len(), "run succeeded");
                s.apply_success(&result);
                SubmitOutcome::Succeeded(result)
            }
            Err(err) => {
                tracing::warn!(kind = ?err.kind(), error = %err, "run failed");
                s.apply_failure(&err);
                SubmitOutcome::Failed(err)
            }
        };
        s.restore_button();
        drop(s);

        match &outcome {
            SubmitOutcome::Succeeded(result) => self.emit(RunEvent::Completed {
                result: Box::new(result.clone()),
            }),
            SubmitOutcome::Failed(err) => self.emit(RunEvent::Error {
                message: err.banner(),
            }),
            _ => {}
        }
        outcome
    }
}
