use core::{fmt::Display, time::Duration};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            delay,
        }
    }
}

/// What a single attempt reports back to the controller.
#[derive(Debug)]
pub enum Attempt<T, E> {
    Done(T),
    Retry(E),
    Fatal(E),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    Success(T),
    RetriesExhausted { attempts: u32, last_error: Option<E> },
    Fatal(E),
}

impl<T, E> RetryOutcome<T, E> {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// Records requested delays without waiting.
#[derive(Debug, Default)]
pub struct CountingSleeper {
    calls: AtomicU32,
}

impl CountingSleeper {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Sleeper for CountingSleeper {
    async fn sleep(&self, _: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

/// Runs `op` until it reports `Done`, a `Fatal` error, or the attempt budget
/// runs out. `op` receives the 1-based attempt number. The sleeper is only
/// consulted between attempts, never after the last one.
pub async fn retry<T, E, F, Fut, S>(policy: RetryPolicy, sleeper: &S, mut op: F) -> RetryOutcome<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
    S: Sleeper,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match op(attempt).await {
            Attempt::Done(value) => return RetryOutcome::Success(value),
            Attempt::Fatal(err) => {
                tracing::error!(target: "retry", "\x1b[31mattempt {attempt} failed fatally\x1b[0m: {err}");
                return RetryOutcome::Fatal(err);
            }
            Attempt::Retry(err) => {
                tracing::warn!(target: "retry", "attempt {attempt}/{} failed: {err}", policy.max_attempts);
                last_error = Some(err);
            }
        }

        if attempt < policy.max_attempts {
            sleeper.sleep(policy.delay).await;
        }
    }

    RetryOutcome::RetriesExhausted { attempts: policy.max_attempts, last_error }
}

/// Re-runs the whole `inner` sequence while its result reports maintenance.
/// Once the outer budget is spent the last maintenance result is returned.
pub async fn retry_while_maintenance<T, F, Fut, P, S>(
    policy: RetryPolicy,
    sleeper: &S,
    is_maintenance: P,
    mut inner: F,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
    S: Sleeper,
{
    let mut round = 1;
    loop {
        let result = inner().await;
        if !is_maintenance(&result) {
            return result;
        }
        if round >= policy.max_attempts {
            tracing::warn!(target: "retry", "\x1b[33mstill under maintenance after {round} rounds\x1b[0m, giving up");
            return result;
        }
        tracing::info!(target: "retry", "page under maintenance, waiting {:?} (round {round}/{})", policy.delay, policy.max_attempts);
        sleeper.sleep(policy.delay).await;
        round += 1;
    }
}
