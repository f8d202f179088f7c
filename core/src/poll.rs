//! Polling read endpoints until they converge.
//!
//! Gallery read endpoints are independently updated replicas. A change is only
//! observable to clients once every replica shows it, so [`wait_until`] polls
//! each target concurrently and succeeds only when all of them satisfy the
//! predicate before the deadline.
//!
//! The probe does the I/O and may fail; a not-found answer is a regular
//! [`Probe::NotFound`] that the predicate gets to judge. The predicate itself
//! must be a pure function of the probe.

use std::{
    fmt::{Debug, Display},
    future::Future,
    time::{Duration, Instant},
};

use futures::stream::{FuturesUnordered, StreamExt};
use gallery_registry_core::Probe;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Longest rendering of the last observed response kept in a timeout.
const LAST_OBSERVED_LIMIT: usize = 512;

#[derive(Debug, Clone, bon::Builder)]
pub struct WaitOptions {
    /// Hard ceiling on how long a target is polled. The last attempt may start
    /// exactly at the ceiling, never after it.
    pub max_wait: Duration,
    pub sleep_interval: Duration,
    pub cancel: Option<CancellationToken>,
}

impl WaitOptions {
    pub fn new(
        max_wait: Duration,
        sleep_interval: Duration,
    ) -> Self {
        Self {
            max_wait,
            sleep_interval,
            cancel: None,
        }
    }

    pub fn with_cancellation(
        mut self,
        cancel: CancellationToken,
    ) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// One target that satisfied the predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged {
    pub target: String,
    pub elapsed: Duration,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    pub targets: Vec<Converged>,
}

impl Convergence {
    /// The target that took longest to converge.
    pub fn slowest(&self) -> Option<&Converged> {
        self.targets
            .iter()
            .max_by_key(|converged| converged.elapsed)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "'{target}' did not converge within {elapsed:?} ({attempts} attempts), last observed: {last_observed}"
)]
pub struct ConvergenceTimeout {
    pub target: String,
    pub elapsed: Duration,
    pub attempts: u32,
    pub last_observed: String,
}

#[derive(thiserror::Error, Debug)]
pub enum PollError {
    #[error("no poll targets configured")]
    NoTargetsConfigured,

    #[error("{} of {total} targets did not converge: {}", .timeouts.len(), join_timeouts(.timeouts))]
    Timeout {
        total: usize,
        timeouts: Vec<ConvergenceTimeout>,
    },

    #[error("probe of '{target}' failed: {source}")]
    Probe {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("wait on '{target}' cancelled after {elapsed:?}")]
    Cancelled { target: String, elapsed: Duration },
}

impl PollError {
    pub fn timeouts(&self) -> &[ConvergenceTimeout] {
        match self {
            Self::Timeout { timeouts, .. } => timeouts,
            _ => &[],
        }
    }
}

fn join_timeouts(timeouts: &[ConvergenceTimeout]) -> String {
    timeouts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe<R: Debug>(probe: &Probe<R>) -> String {
    match probe {
        Probe::NotFound => "not found".into(),
        Probe::Found(response) => {
            let rendered = format!("{response:?}");
            if rendered.chars().count() > LAST_OBSERVED_LIMIT {
                let head: String = rendered
                    .chars()
                    .take(LAST_OBSERVED_LIMIT)
                    .collect();
                format!("{head}...")
            } else {
                rendered
            }
        },
    }
}

/// Sleeps for `duration`. Returns `false` if the token fired first.
async fn pause(
    duration: Duration,
    cancel: Option<&CancellationToken>,
) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(duration) => true,
            }
        },
        None => {
            tokio::time::sleep(duration).await;
            true
        },
    }
}

/// Polls a single target until `is_complete` holds or `options.max_wait`
/// elapses.
pub async fn wait_until_one<T, R, E, F, Fut, P>(
    target: T,
    fetch: &F,
    is_complete: &P,
    options: &WaitOptions,
) -> Result<Converged, PollError>
where
    T: Clone + Display,
    R: Debug,
    E: Into<BoxError>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<Probe<R>, E>>,
    P: Fn(&Probe<R>) -> bool, {
    let name = target.to_string();
    let span = tracing::debug_span!("poll", target = %name);

    async move {
        let start = Instant::now();
        let mut attempts = 0u32;
        let mut final_attempt = false;

        loop {
            if options
                .cancel
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                return Err(PollError::Cancelled {
                    target: name,
                    elapsed: start.elapsed(),
                });
            }

            attempts += 1;
            let probe = fetch(target.clone()).await.map_err(|source| {
                PollError::Probe {
                    target: name.clone(),
                    source: source.into(),
                }
            })?;

            let elapsed = start.elapsed();

            if is_complete(&probe) {
                tracing::info!(attempts, ?elapsed, "converged");
                return Ok(Converged {
                    target: name,
                    elapsed,
                    attempts,
                });
            }

            tracing::debug!(attempts, ?elapsed, found = probe.is_found(), "not converged");

            let remaining = options.max_wait.saturating_sub(elapsed);
            if final_attempt || remaining.is_zero() {
                let timeout = ConvergenceTimeout {
                    target: name,
                    elapsed,
                    attempts,
                    last_observed: describe(&probe),
                };
                tracing::warn!("{}", timeout);
                return Err(PollError::Timeout {
                    total: 1,
                    timeouts: vec![timeout],
                });
            }

            // the last sleep is cut short so one attempt lands on the deadline
            let sleep = if options.sleep_interval >= remaining {
                final_attempt = true;
                remaining
            } else {
                options.sleep_interval
            };

            if !pause(sleep, options.cancel.as_ref()).await {
                return Err(PollError::Cancelled {
                    target: name,
                    elapsed: start.elapsed(),
                });
            }
        }
    }
    .instrument(span)
    .await
}

/// Polls every target concurrently with the same predicate and deadline.
///
/// Succeeds only if all targets converge. Timeouts are aggregated so the error
/// names every replica that lagged. A probe failure or cancellation on any
/// target is returned as soon as it happens and stops the remaining targets.
pub async fn wait_until<T, R, E, F, Fut, P>(
    targets: &[T],
    fetch: F,
    is_complete: P,
    options: &WaitOptions,
) -> Result<Convergence, PollError>
where
    T: Clone + Display,
    R: Debug,
    E: Into<BoxError>,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<Probe<R>, E>>,
    P: Fn(&Probe<R>) -> bool, {
    if targets.is_empty() {
        return Err(PollError::NoTargetsConfigured);
    }

    let mut pending: FuturesUnordered<_> = targets
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, target)| {
            let attempt = wait_until_one(target, &fetch, &is_complete, options);
            async move { (index, attempt.await) }
        })
        .collect();

    let mut converged = Vec::with_capacity(targets.len());
    let mut timeouts = Vec::new();

    while let Some((index, result)) = pending.next().await {
        match result {
            Ok(target) => converged.push((index, target)),
            Err(PollError::Timeout { timeouts: t, .. }) => {
                timeouts.extend(t.into_iter().map(|timeout| (index, timeout)));
            },
            // dropping `pending` stops the targets still polling
            Err(err) => return Err(err),
        }
    }

    if !timeouts.is_empty() {
        timeouts.sort_by_key(|(index, _)| *index);
        return Err(PollError::Timeout {
            total: targets.len(),
            timeouts: timeouts.into_iter().map(|(_, timeout)| timeout).collect(),
        });
    }

    converged.sort_by_key(|(index, _)| *index);
    Ok(Convergence {
        targets: converged.into_iter().map(|(_, target)| target).collect(),
    })
}
