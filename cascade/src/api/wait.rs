//! Generic wait-for-state polling for async provisioning
//!
//! Most control-plane objects (clusters, connectors, API keys) provision
//! asynchronously: the create call returns immediately and the object walks
//! a remote state machine. `wait_for_state` blocks the calling task until
//! the observed status leaves the pending set and settles in the target
//! set, the configured timeout elapses, or the object reports a state that
//! belongs to neither set.
//!
//! Status strings are compared verbatim against the configured sets. A
//! status outside both sets aborts immediately rather than retrying: an
//! unknown state will not fix itself by polling again.

use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tfcore::context::Context;

use super::error::ApiError;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out after {timeout:?} waiting for state {target:?}; last observed state: {last_state:?}")]
    Timeout {
        timeout: Duration,
        target: Vec<String>,
        last_state: Option<String>,
    },

    #[error("resource entered unexpected state {state:?}; expected one of {expected:?}")]
    UnexpectedState { state: String, expected: Vec<String> },

    #[error("operation cancelled while waiting for state {target:?}")]
    Cancelled { target: Vec<String> },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Per-invocation polling configuration.
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    /// Status values considered still in progress
    pub pending: Vec<String>,
    /// Status values considered terminal success
    pub target: Vec<String>,
    /// Hard ceiling on total wait, sleeps included
    pub timeout: Duration,
    /// Wait before the first poll, lets eventual consistency settle
    pub initial_delay: Duration,
    /// Spacing between polls
    pub poll_interval: Duration,
    /// Consecutive target observations required before success; any
    /// non-target observation resets the count
    pub continuous_target_occurrences: u32,
}

impl StateChangeConf {
    pub fn new<S: Into<String>>(
        pending: impl IntoIterator<Item = S>,
        target: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            timeout: Duration::from_secs(20 * 60),
            initial_delay: Duration::ZERO,
            poll_interval: Duration::from_secs(5),
            continuous_target_occurrences: 1,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn continuous_target_occurrences(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrences = occurrences.max(1);
        self
    }

    fn expected_states(&self) -> Vec<String> {
        let mut expected = self.pending.clone();
        expected.extend(self.target.iter().cloned());
        expected
    }
}

/// Poll `refresh` until the reported status reaches the target set.
///
/// Transient refresh errors (per `ApiError::is_retryable`) are retried up
/// to the timeout; terminal errors abort immediately. Cancelling the
/// context aborts between polls.
pub async fn wait_for_state<T, F, Fut>(
    ctx: &Context,
    conf: &StateChangeConf,
    mut refresh: F,
) -> Result<T, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(T, String), ApiError>>,
{
    let started = Instant::now();

    sleep_unless_cancelled(ctx, conf.initial_delay, &conf.target).await?;

    let mut consecutive_target = 0u32;
    let mut last_state: Option<String> = None;

    loop {
        if ctx.is_cancelled() {
            return Err(WaitError::Cancelled {
                target: conf.target.clone(),
            });
        }

        match refresh().await {
            Ok((resource, state)) => {
                tracing::debug!(%state, "polled resource state");
                last_state = Some(state.clone());

                if conf.target.iter().any(|t| *t == state) {
                    consecutive_target += 1;
                    if consecutive_target >= conf.continuous_target_occurrences {
                        return Ok(resource);
                    }
                } else {
                    consecutive_target = 0;
                    if !conf.pending.iter().any(|p| *p == state) {
                        return Err(WaitError::UnexpectedState {
                            state,
                            expected: conf.expected_states(),
                        });
                    }
                }
            }
            Err(e) if e.is_retryable() => {
                tracing::debug!(error = %e, "transient error while polling, will retry");
            }
            Err(e) => return Err(WaitError::Api(e)),
        }

        if started.elapsed() >= conf.timeout {
            return Err(WaitError::Timeout {
                timeout: conf.timeout,
                target: conf.target.clone(),
                last_state,
            });
        }

        sleep_unless_cancelled(ctx, conf.poll_interval, &conf.target).await?;
    }
}

async fn sleep_unless_cancelled(
    ctx: &Context,
    duration: Duration,
    target: &[String],
) -> Result<(), WaitError> {
    if duration.is_zero() {
        return Ok(());
    }

    let mut done = ctx.done();
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = done.changed() => Err(WaitError::Cancelled {
            target: target.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn conf(pending: &[&str], target: &[&str]) -> StateChangeConf {
        StateChangeConf::new(pending.to_vec(), target.to_vec())
            .timeout(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(10))
    }

    /// Refresh callback that replays a scripted sequence of results and
    /// counts invocations.
    fn scripted(
        script: Vec<Result<&'static str, ApiError>>,
    ) -> (
        impl FnMut() -> std::future::Ready<Result<(u32, String), ApiError>>,
        Arc<Mutex<u32>>,
    ) {
        let queue = Arc::new(Mutex::new(VecDeque::from(script)));
        let calls = Arc::new(Mutex::new(0u32));
        let calls_clone = calls.clone();

        let refresh = move || {
            let mut calls = calls_clone.lock().unwrap();
            *calls += 1;
            let n = *calls;
            let result = queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("refresh called more times than scripted");
            std::future::ready(result.map(|state| (n, state.to_string())))
        };

        (refresh, calls)
    }

    #[tokio::test]
    async fn reaches_target_after_pending() {
        let (refresh, calls) = scripted(vec![
            Ok("PROVISIONING"),
            Ok("PROVISIONING"),
            Ok("PROVISIONED"),
        ]);

        let result = wait_for_state(
            &Context::new(),
            &conf(&["PROVISIONING"], &["PROVISIONED"]),
            refresh,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn consecutive_occurrences_reset_on_non_target() {
        // target, pending, target, target with threshold 2: the run must
        // NOT succeed at the second read; only the final pair counts.
        let (refresh, calls) = scripted(vec![
            Ok("ONLINE"),
            Ok("PROPAGATING"),
            Ok("ONLINE"),
            Ok("ONLINE"),
        ]);

        let result = wait_for_state(
            &Context::new(),
            &conf(&["PROPAGATING"], &["ONLINE"]).continuous_target_occurrences(2),
            refresh,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(*calls.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn unexpected_state_aborts_without_polling_again() {
        let (refresh, calls) = scripted(vec![Ok("FAILED")]);

        let started = Instant::now();
        let result = wait_for_state(
            &Context::new(),
            &conf(&["PROVISIONING"], &["PROVISIONED"]).poll_interval(Duration::from_secs(60)),
            refresh,
        )
        .await;

        match result {
            Err(WaitError::UnexpectedState { state, expected }) => {
                assert_eq!(state, "FAILED");
                assert!(expected.contains(&"PROVISIONING".to_string()));
                assert!(expected.contains(&"PROVISIONED".to_string()));
            }
            other => panic!("expected UnexpectedState, got {:?}", other.map(|_| ())),
        }
        assert_eq!(*calls.lock().unwrap(), 1);
        // No poll interval was consumed after the fatal read.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let (refresh, calls) = scripted(vec![
            Err(ApiError::ServiceUnavailable),
            Err(ApiError::RateLimited),
            Ok("PROVISIONED"),
        ]);

        let result = wait_for_state(
            &Context::new(),
            &conf(&["PROVISIONING"], &["PROVISIONED"]),
            refresh,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn terminal_error_aborts_immediately() {
        let (refresh, calls) = scripted(vec![Err(ApiError::Api {
            status: 400,
            message: "bad request".to_string(),
        })]);

        let result = wait_for_state(
            &Context::new(),
            &conf(&["PROVISIONING"], &["PROVISIONED"]),
            refresh,
        )
        .await;

        assert!(matches!(result, Err(WaitError::Api(ApiError::Api { .. }))));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn all_pending_run_ends_in_timeout() {
        let queue: Vec<Result<&'static str, ApiError>> =
            std::iter::repeat_with(|| Ok("PROVISIONING")).take(100).collect();
        let (refresh, _calls) = scripted(queue);

        let result = wait_for_state(
            &Context::new(),
            &conf(&["PROVISIONING"], &["PROVISIONED"]).timeout(Duration::from_millis(50)),
            refresh,
        )
        .await;

        match result {
            Err(WaitError::Timeout { last_state, .. }) => {
                assert_eq!(last_state.as_deref(), Some("PROVISIONING"));
            }
            other => panic!("expected Timeout, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn cancelled_context_stops_the_wait() {
        let queue: Vec<Result<&'static str, ApiError>> =
            std::iter::repeat_with(|| Ok("PROVISIONING")).take(100).collect();
        let (refresh, _calls) = scripted(queue);

        let ctx = Context::new();
        let cancel_ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel_ctx.cancel();
        });

        let result = wait_for_state(
            &ctx,
            &conf(&["PROVISIONING"], &["PROVISIONED"]).timeout(Duration::from_secs(60)),
            refresh,
        )
        .await;

        assert!(matches!(result, Err(WaitError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn initial_delay_precedes_first_poll() {
        let (refresh, _calls) = scripted(vec![Ok("PROVISIONED")]);

        let started = Instant::now();
        let result = wait_for_state(
            &Context::new(),
            &conf(&["PROVISIONING"], &["PROVISIONED"])
                .initial_delay(Duration::from_millis(50)),
            refresh,
        )
        .await;

        assert!(result.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
