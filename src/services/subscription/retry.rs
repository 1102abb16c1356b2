use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::services::billing::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt number `n` (1-based) is about to run.
    Attempting(u32),
    /// Attempt `n` failed transiently; wait `delay` before attempt `n + 1`.
    BackingOff { attempt: u32, delay: Duration },
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Retryable,
    Fatal,
}

impl AttemptOutcome {
    pub fn of<T>(result: &Result<T, FetchError>) -> Self {
        match result {
            Ok(_) => AttemptOutcome::Success,
            Err(err) if err.is_retryable() => AttemptOutcome::Retryable,
            Err(_) => AttemptOutcome::Fatal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay after a failed attempt `n`: base, 2*base, 4*base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    pub fn start(&self) -> RetryState {
        RetryState::Attempting(1)
    }

    /// `outcome` is only consulted while `Attempting`.
    pub fn next(&self, state: RetryState, outcome: AttemptOutcome) -> RetryState {
        match state {
            RetryState::Attempting(attempt) => match outcome {
                AttemptOutcome::Success => RetryState::Succeeded,
                AttemptOutcome::Retryable if attempt < self.max_attempts => {
                    RetryState::BackingOff {
                        attempt,
                        delay: self.delay_after(attempt),
                    }
                }
                AttemptOutcome::Retryable | AttemptOutcome::Fatal => RetryState::Failed,
            },
            RetryState::BackingOff { attempt, .. } => RetryState::Attempting(attempt + 1),
            terminal => terminal,
        }
    }

    /// Drives `op` through the state machine until it succeeds or fails for good.
    pub async fn run<T, F, Fut>(&self, user_id: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut state = self.start();
        let mut last: Option<Result<T, FetchError>> = None;

        loop {
            match state {
                RetryState::Attempting(attempt) => {
                    debug!(user_id, attempt, "fetching subscription status");
                    let result = op().await;
                    let outcome = AttemptOutcome::of(&result);
                    state = self.next(state, outcome);
                    if let (RetryState::BackingOff { delay, .. }, Err(err)) = (&state, &result) {
                        debug!(
                            user_id,
                            attempt,
                            ?delay,
                            %err,
                            "subscription status fetch failed; retrying"
                        );
                    }
                    last = Some(result);
                }
                RetryState::BackingOff { delay, .. } => {
                    sleep(delay).await;
                    state = self.next(state, AttemptOutcome::Retryable);
                }
                RetryState::Succeeded | RetryState::Failed => {
                    return last.unwrap_or_else(|| {
                        Err(FetchError::Request("retry loop finished without an attempt".into()))
                    });
                }
            }
        }
    }
}
