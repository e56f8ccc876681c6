//! Time-driven progress approximation.
//!
//! The run endpoint gives no intermediate signal, so progress is simulated from elapsed time.
//! The bar climbs in fixed steps and stops at [`RUNNING_CAP`] until the orchestrator calls
//! [`ProgressAnimator::finish`].

use crate::model::RunEvent;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const STAGES: [&str; 5] = [
    "Parsing job description",
    "Mapping skills to ATS keywords",
    "Rewriting impact bullets",
    "Generating cover letter",
    "Exporting PDF pack",
];

pub const TICK_STEP: u8 = 6;
pub const RUNNING_CAP: u8 = 92;
pub const READY_LABEL: &str = "Ready to tailor";
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(350);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub percent: u8,
    /// Index of the next stage to be reached; equals `STAGES.len()` once all are done.
    pub current_stage: usize,
    pub completed: BTreeSet<usize>,
    pub label: String,
    ticking: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            percent: 0,
            current_stage: 0,
            completed: BTreeSet::new(),
            label: READY_LABEL.to_string(),
            ticking: false,
        }
    }
}

impl ProgressState {
    pub fn stage_count(&self) -> usize {
        STAGES.len()
    }

    pub fn is_stage_done(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn begin(&mut self) {
        self.percent = 0;
        self.current_stage = 0;
        self.completed.clear();
        self.label = STAGES[0].to_string();
        self.ticking = true;
    }

    /// Apply one tick. Returns the index of the stage reached on this tick, if any.
    ///
    /// At most one stage advances per tick even when a large step crosses several thresholds.
    pub fn advance(&mut self) -> Option<usize> {
        if !self.ticking {
            return None;
        }
        self.percent = self.percent.saturating_add(TICK_STEP).min(RUNNING_CAP);

        let stages = STAGES.len();
        // percent / cap >= (stage + 1) / stages, kept in integers.
        let threshold_crossed = self.current_stage < stages
            && usize::from(self.percent) * stages
                >= (self.current_stage + 1) * usize::from(RUNNING_CAP);
        if !threshold_crossed {
            return None;
        }
        let index = self.current_stage;
        self.completed.insert(index);
        self.label = STAGES[index].to_string();
        self.current_stage += 1;
        Some(index)
    }

    fn finish(&mut self, label: &str) {
        self.ticking = false;
        self.percent = 100;
        self.label = label.to_string();
    }
}

fn lock(state: &Mutex<ProgressState>) -> MutexGuard<'_, ProgressState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the progress state and the repeating tick task that drives it.
pub struct ProgressAnimator {
    state: Arc<Mutex<ProgressState>>,
    interval: Duration,
    ticker: Option<JoinHandle<()>>,
    event_tx: Option<UnboundedSender<RunEvent>>,
}

impl ProgressAnimator {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState::default())),
            interval,
            ticker: None,
            event_tx: None,
        }
    }

    pub fn with_events(mut self, event_tx: UnboundedSender<RunEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn snapshot(&self) -> ProgressState {
        lock(&self.state).clone()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn reset(&mut self) {
        self.stop_ticker();
        lock(&self.state).reset();
    }

    /// Start ticking. The first tick lands one interval after the call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.stop_ticker();
        lock(&self.state).begin();

        let state = self.state.clone();
        let event_tx = self.event_tx.clone();
        let period = self.interval;
        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_percent = 0u8;
            loop {
                ticker.tick().await;
                let (percent, reached) = {
                    let mut s = lock(&state);
                    if !s.ticking {
                        break;
                    }
                    let reached = s.advance().map(|index| (index, s.label.clone()));
                    (s.percent, reached)
                };
                let Some(tx) = event_tx.as_ref() else {
                    continue;
                };
                if percent != last_percent {
                    let _ = tx.send(RunEvent::Progress { percent });
                    last_percent = percent;
                }
                if let Some((index, label)) = reached {
                    tracing::debug!(index, %label, "progress stage reached");
                    let _ = tx.send(RunEvent::StageReached { index, label });
                }
            }
        }));
    }

    /// Stop ticking and show the terminal label at 100%. Safe to call when not started.
    pub fn finish(&mut self, label: &str) {
        self.stop_ticker();
        lock(&self.state).finish(label);
        if let Some(tx) = self.event_tx.as_ref() {
            let _ = tx.send(RunEvent::Progress { percent: 100 });
            let _ = tx.send(RunEvent::Finished {
                label: label.to_string(),
            });
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        // A tick already in flight sees this flag and leaves the state alone.
        lock(&self.state).ticking = false;
    }
}

impl Drop for ProgressAnimator {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}
