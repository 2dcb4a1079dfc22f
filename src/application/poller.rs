use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shortest tick period a poll runs with; tokio rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Fetch budget for a confirmation poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<R> {
    /// The resource reached the expected state on poll number `attempts`.
    Confirmed { resource: R, attempts: u32 },
    /// The budget ran out. `reconciled` is the result of one final fetch,
    /// whatever state it shows.
    Exhausted { reconciled: Option<R>, attempts: u32 },
    /// The session was cancelled before reaching a terminal state.
    Cancelled,
}

/// Re-fetches a resource on a fixed interval until it looks settled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationPoller {
    config: PollConfig,
}

impl ConfirmationPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    /// Polls until `is_confirmed` holds, the budget is spent, or `cancel` fires.
    ///
    /// The first fetch happens one interval after the call. Fetch errors count
    /// as unconfirmed attempts.
    pub async fn run<R, F, Fut, C>(
        &self,
        mut fetch: F,
        is_confirmed: C,
        cancel: &CancellationToken,
    ) -> PollOutcome<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
        C: Fn(&R) -> bool,
    {
        let interval = self.config.interval.max(MIN_INTERVAL);
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts = 0;

        while attempts < self.config.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollOutcome::Cancelled,
                fetched = fetch() => fetched,
            };
            attempts += 1;

            match fetched {
                Ok(resource) if is_confirmed(&resource) => {
                    info!(attempts, "Payment confirmed");
                    return PollOutcome::Confirmed { resource, attempts };
                }
                Ok(_) => debug!(attempts, "Payment not confirmed yet"),
                Err(e) => warn!(attempts, error = %e, "Confirmation fetch failed"),
            }
        }

        info!(attempts, "Confirmation budget exhausted, reconciling");
        let reconciled = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Cancelled,
            fetched = fetch() => fetched,
        };
        let reconciled = match reconciled {
            Ok(resource) => Some(resource),
            Err(e) => {
                warn!(error = %e, "Reconciliation fetch failed");
                None
            }
        };

        PollOutcome::Exhausted {
            reconciled,
            attempts,
        }
    }
}

/// Owned handle to a spawned poll. Dropping it stops the timer.
#[derive(Debug)]
pub struct PollSession<T> {
    token: CancellationToken,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> PollSession<T> {
    /// Spawns `task` with a child of `parent`, so cancelling the parent
    /// stops this session too.
    pub fn spawn<F, Fut>(parent: &CancellationToken, task: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let token = parent.child_token();
        let handle = tokio::spawn(task(token.clone()));
        Self { token, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task. `None` if it panicked or was aborted.
    pub async fn join(mut self) -> Option<T> {
        (&mut self.handle).await.ok()
    }
}

impl<T> Drop for PollSession<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
