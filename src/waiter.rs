//! Waiting for a run to reach a terminal status.
//!
//! The wait is a small state machine:
//!
//! ```text
//! Started ──terminal──▶ Terminal
//!    │
//!    └──────────────▶ Polling ──terminal──▶ Terminal
//!                      │  ▲
//!                      └──┘ still running
//!                      │
//!                      └──budget spent / cancelled──▶ TimedOut
//! ```
//!
//! The wait budget is enforced through a [`CancellationToken`] that is
//! cancelled when the deadline passes. An in-flight poll is dropped at that
//! point; the run itself keeps going on the platform.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::runs::RunClient;
use crate::types::{FailurePolicy, Run};

/// Longest `waitForFinish` the backend accepts per request, in seconds.
pub const MAX_WAIT_FOR_FINISH_SECS: u64 = 999;

enum WaitState {
    Started(Run),
    Polling(Run),
    Terminal(Run),
    TimedOut(Run),
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WaitOutcome {
    /// The run reached a terminal status.
    Finished(Run),
    /// The budget ran out or the caller cancelled; holds the latest known state.
    TimedOut(Run),
}

impl WaitOutcome {
    /// Resolve the outcome into the value `call()` returns.
    pub(crate) fn into_result(self, policy: FailurePolicy) -> Result<Run> {
        match self {
            Self::Finished(run)
                if policy == FailurePolicy::Error && run.status.is_unsuccessful() =>
            {
                Err(Error::RunFailed {
                    run_id: run.id,
                    status: run.status,
                })
            }
            Self::Finished(run) | Self::TimedOut(run) => Ok(run),
        }
    }
}

pub(crate) struct RunWaiter {
    run: RunClient,
    budget: Option<Duration>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl RunWaiter {
    /// `wait_secs` of `None` or `0` waits until the run finishes.
    pub(crate) fn new(
        run: RunClient,
        wait_secs: Option<u64>,
        parent: Option<&CancellationToken>,
    ) -> Self {
        let budget = wait_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let cancel = parent.map_or_else(CancellationToken::new, CancellationToken::child_token);
        Self {
            poll_interval: run.poll_interval(),
            run,
            budget,
            cancel,
        }
    }

    pub(crate) async fn wait(self, started: Run) -> Result<WaitOutcome> {
        let deadline = self.budget.map(|budget| Instant::now() + budget);
        let mut state = WaitState::Started(started);

        loop {
            state = match state {
                WaitState::Started(run) if run.status.is_terminal() => WaitState::Terminal(run),
                WaitState::Started(run) => WaitState::Polling(run),
                WaitState::Polling(run) => self.poll(run, deadline).await?,
                WaitState::Terminal(run) => {
                    info!(
                        name: "run.wait.finished",
                        run_id = %run.id,
                        status = %run.status,
                        "Run finished"
                    );
                    return Ok(WaitOutcome::Finished(run));
                }
                WaitState::TimedOut(run) => {
                    info!(
                        name: "run.wait.timed_out",
                        run_id = %run.id,
                        status = %run.status,
                        "Stopped waiting for run"
                    );
                    return Ok(WaitOutcome::TimedOut(run));
                }
            };
        }
    }

    async fn poll(&self, run: Run, deadline: Option<Instant>) -> Result<WaitState> {
        let remaining = deadline.map(|at| at.saturating_duration_since(Instant::now()));
        let secs = wait_for_finish_secs(remaining);
        debug!(
            name: "run.wait.poll",
            run_id = %run.id,
            status = %run.status,
            wait_for_finish = secs,
            "Polling run status"
        );

        let Some(fetched) = self.guarded(deadline, self.run.get_waiting(secs)).await else {
            return Ok(WaitState::TimedOut(run));
        };
        let latest = fetched?.ok_or_else(|| Error::RunNotFound {
            run_id: run.id.clone(),
        })?;
        if latest.status.is_terminal() {
            return Ok(WaitState::Terminal(latest));
        }

        if self
            .guarded(deadline, tokio::time::sleep(self.poll_interval))
            .await
            .is_none()
        {
            return Ok(WaitState::TimedOut(latest));
        }
        Ok(WaitState::Polling(latest))
    }

    /// Run `fut` unless the token is cancelled or the deadline passes first.
    async fn guarded<F: Future>(&self, deadline: Option<Instant>, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            () = until(deadline) => {
                self.cancel.cancel();
                None
            }
            out = fut => Some(out),
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// `waitForFinish` for the next poll: the remaining budget rounded up to whole
/// seconds, capped at the per-request maximum.
fn wait_for_finish_secs(remaining: Option<Duration>) -> u64 {
    match remaining {
        None => MAX_WAIT_FOR_FINISH_SECS,
        Some(left) => {
            let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
            secs.clamp(1, MAX_WAIT_FOR_FINISH_SECS)
        }
    }
}
