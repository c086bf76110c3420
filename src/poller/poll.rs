use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::types::{PollFailure, PollOutcome, PollPolicy, PollReport};
use crate::errors::ScanError;

/// Query `status_fn` until `is_complete` holds, `is_failed` names a reason, the
/// deadline passes, or too many consecutive queries error out.
///
/// The sleep between queries is a tokio timer, so other tasks keep running
/// while a job is being watched. A status query that hangs is cut off at the
/// deadline.
pub async fn poll_until_done<S, F, Fut, C, X>(
    mut status_fn: F,
    is_complete: C,
    is_failed: X,
    policy: &PollPolicy,
) -> PollReport<S>
where
    S: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, ScanError>>,
    C: Fn(&S) -> bool,
    X: Fn(&S) -> Option<String>,
{
    let start = Instant::now();
    let mut queries: u32 = 0;
    let mut consecutive_errors: u32 = 0;
    let mut last_status: Option<S> = None;

    let finish = |outcome: PollOutcome, queries: u32, last_status: Option<S>| PollReport {
        outcome,
        queries,
        last_status,
        elapsed: start.elapsed(),
    };

    loop {
        if is_cancelled(policy.cancel.as_ref()) {
            return finish(PollOutcome::Failed(PollFailure::Cancelled), queries, last_status);
        }

        queries += 1;
        let query = status_fn();
        let result = match remaining(start, policy.deadline) {
            Some(left) => match tokio::time::timeout(left, query).await {
                Ok(result) => Some(result),
                Err(_) => None,
            },
            None => Some(query.await),
        };

        match result {
            None => {
                debug!(queries, "Status query still pending at deadline");
                return finish(PollOutcome::TimedOut, queries, last_status);
            }
            Some(Ok(status)) => {
                consecutive_errors = 0;
                if is_complete(&status) {
                    debug!(queries, ?status, "Job completed");
                    return finish(PollOutcome::Completed, queries, Some(status));
                }
                if let Some(reason) = is_failed(&status) {
                    warn!(queries, ?status, reason = %reason, "Job reported failure");
                    return finish(
                        PollOutcome::Failed(PollFailure::Job(reason)),
                        queries,
                        Some(status),
                    );
                }
                debug!(queries, ?status, "Job still running");
                last_status = Some(status);
            }
            Some(Err(e)) => {
                consecutive_errors += 1;
                warn!(
                    queries,
                    consecutive_errors,
                    max = policy.max_consecutive_errors,
                    error = %e,
                    "Status query failed"
                );
                if consecutive_errors >= policy.max_consecutive_errors {
                    return finish(
                        PollOutcome::Failed(PollFailure::Polling(format!(
                            "{} consecutive status errors, last: {}",
                            consecutive_errors, e
                        ))),
                        queries,
                        last_status,
                    );
                }
            }
        }

        let sleep_for = match remaining(start, policy.deadline) {
            Some(left) if left.is_zero() => {
                return finish(PollOutcome::TimedOut, queries, last_status);
            }
            Some(left) => policy.interval.min(left),
            None => policy.interval,
        };

        tokio::select! {
            _ = tokio::time::sleep(sleep_for) => {}
            _ = wait_cancelled(policy.cancel.as_ref()) => {
                return finish(PollOutcome::Failed(PollFailure::Cancelled), queries, last_status);
            }
        }
    }
}

fn remaining(start: Instant, deadline: Option<Duration>) -> Option<Duration> {
    deadline.map(|d| d.saturating_sub(start.elapsed()))
}

fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.map_or(false, CancellationToken::is_cancelled)
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(t) => t.cancelled().await,
        None => std::future::pending().await,
    }
}
