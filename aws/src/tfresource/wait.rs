use super::{deadline_after, Error, Result};
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tfplug::Context;
use tokio::time::{self, Instant};

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);
const DEFAULT_NOT_FOUND_CHECKS: usize = 20;

/// Refreshes the remote object. `None` means it was not found; otherwise
/// the object and its current state name.
pub type RefreshFn<'a, T> =
    Box<dyn Fn() -> BoxFuture<'a, Result<Option<(T, String)>>> + Send + Sync + 'a>;

/// Polls a remote object until it reaches one of the `target` states.
pub struct StateChangeConf<'a, T> {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub refresh: RefreshFn<'a, T>,
    pub timeout: Duration,
    /// Wait before the first refresh.
    pub delay: Duration,
    /// Lower bound on the wait between refreshes.
    pub min_timeout: Duration,
    /// Fixed wait between refreshes. Zero (or anything from 180s up) falls
    /// back to exponential backoff.
    pub poll_interval: Duration,
    pub not_found_checks: usize,
    /// Number of consecutive target observations required.
    pub continuous_target_occurence: usize,
}

impl<'a, T> StateChangeConf<'a, T> {
    pub fn new<F, Fut>(pending: &[&str], target: &[&str], timeout: Duration, refresh: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'a,
        Fut: Future<Output = Result<Option<(T, String)>>> + Send + 'a,
    {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            refresh: Box::new(move || Box::pin(refresh())),
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurence: 1,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_not_found_checks(mut self, checks: usize) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn with_continuous_target_occurence(mut self, occurence: usize) -> Self {
        self.continuous_target_occurence = occurence.max(1);
        self
    }

    /// Returns the object in its target state, or `None` when the target
    /// list is empty and the object disappeared.
    pub async fn wait_for_state(&self, ctx: &Context) -> Result<Option<T>> {
        let deadline = deadline_after(self.timeout);
        let mut last_state = String::new();
        let mut target_occurence = 0;
        let mut not_found_tick = 0;
        let mut wait = INITIAL_WAIT;

        self.pause(ctx, self.delay, deadline, &last_state).await?;

        loop {
            let refreshed = tokio::select! {
                result = (self.refresh)() => result?,
                _ = ctx.cancelled() => return Err(Error::Cancelled),
                _ = time::sleep_until(deadline) => return Err(self.timeout_error(&last_state)),
            };

            match refreshed {
                None if self.target.is_empty() => {
                    target_occurence += 1;
                    if target_occurence >= self.continuous_target_occurence {
                        return Ok(None);
                    }
                }
                None => {
                    target_occurence = 0;
                    not_found_tick += 1;
                    if not_found_tick > self.not_found_checks {
                        return Err(Error::not_found(format!(
                            "couldn't find resource ({not_found_tick} retries)"
                        )));
                    }
                }
                Some((value, state)) => {
                    not_found_tick = 0;
                    if self.target.contains(&state) {
                        target_occurence += 1;
                        if target_occurence >= self.continuous_target_occurence {
                            return Ok(Some(value));
                        }
                    } else if self.pending.contains(&state) {
                        target_occurence = 0;
                    } else if !self.pending.is_empty() {
                        return Err(Error::UnexpectedState {
                            state,
                            expected: self.target.clone(),
                            last_error: None,
                        });
                    }
                    last_state = state;
                }
            }

            if target_occurence == 0 {
                wait *= 2;
            }
            let interval = if !self.poll_interval.is_zero() && self.poll_interval < MAX_POLL_INTERVAL {
                self.poll_interval
            } else {
                wait.max(self.min_timeout).min(MAX_WAIT)
            };
            wait = interval;

            tracing::trace!(state = %last_state, wait = ?interval, "waiting for state change");
            self.pause(ctx, interval, deadline, &last_state).await?;
        }
    }

    async fn pause(
        &self,
        ctx: &Context,
        duration: Duration,
        deadline: Instant,
        last_state: &str,
    ) -> Result<()> {
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = time::sleep(duration) => Ok(()),
            _ = ctx.cancelled() => Err(Error::Cancelled),
            _ = time::sleep_until(deadline) => Err(self.timeout_error(last_state)),
        }
    }

    fn timeout_error(&self, last_state: &str) -> Error {
        Error::Timeout {
            last_state: last_state.to_string(),
            expected: self.target.clone(),
            timeout: self.timeout,
            last_error: None,
        }
    }
}
