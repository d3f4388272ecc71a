//! Retry with exponential backoff around flaky upstream calls.
//!
//! Transient failures (timeouts, dropped connections, redirect loops) are
//! retried after `base_delay * 2^i` where `i` is the zero-based index of the
//! failed attempt. Any other error is returned on the spot. When every
//! attempt fails transiently the caller gets [`Fetched::Unavailable`] rather
//! than an error, so "no data right now" stays distinguishable from both a
//! bug and an empty-but-successful result.

use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{FetchError, TransientKind};

/// Blocking pause between attempts. Injected so tests can observe the
/// schedule without waiting for it.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Parks the calling thread for the full delay.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Stats and scoreboard requests: 5 attempts, 3 s base delay.
    pub fn data() -> Self {
        RetryPolicy::new(5, Duration::from_secs(3))
    }

    /// Calls made while a user waits on a form (sign-in and friends).
    pub fn interactive() -> Self {
        RetryPolicy::new(3, Duration::from_secs(1))
    }

    /// Backoff after the failed attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Total blocking time when every attempt fails transiently.
    pub fn worst_case(&self) -> Duration {
        (0..self.max_attempts)
            .map(|i| self.delay_for(i))
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::data()
    }
}

/// Result of a fetch that did not hit a fatal error.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    /// Every attempt failed transiently.
    Unavailable,
}

impl<T> Fetched<T> {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Fetched::Unavailable)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Fetched::Data(v) => Some(v),
            Fetched::Unavailable => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Data(v) => Fetched::Data(f(v)),
            Fetched::Unavailable => Fetched::Unavailable,
        }
    }

    /// Apply a fallible transform to the payload; `Unavailable` passes through.
    pub fn and_then<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Fetched<U>, E> {
        match self {
            Fetched::Data(v) => f(v).map(Fetched::Data),
            Fetched::Unavailable => Ok(Fetched::Unavailable),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Transient(TransientKind),
    Fatal,
}

/// One call of the wrapped operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchAttempt {
    pub index: u32,
    pub delay_before: Duration,
    pub outcome: AttemptOutcome,
}

/// Outcome of a fetch together with every attempt made, fatal ones included.
#[derive(Debug)]
pub struct FetchReport<T> {
    pub result: Result<Fetched<T>, FetchError>,
    pub attempts: Vec<FetchAttempt>,
}

pub struct RetryingFetcher {
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl RetryingFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryingFetcher::with_sleeper(policy, Box::new(ThreadSleeper))
    }

    pub fn with_sleeper(policy: RetryPolicy, sleeper: Box<dyn Sleeper>) -> Self {
        RetryingFetcher { policy, sleeper }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn fetch<T, F>(&self, operation: F) -> Result<Fetched<T>, FetchError>
    where
        F: FnMut() -> Result<T, FetchError>,
    {
        self.fetch_traced(operation).result
    }

    /// Like [`fetch`](Self::fetch) but also returns every attempt made.
    pub fn fetch_traced<T, F>(&self, mut operation: F) -> FetchReport<T>
    where
        F: FnMut() -> Result<T, FetchError>,
    {
        let max = self.policy.max_attempts;
        let mut attempts = Vec::with_capacity(max as usize);
        let mut delay_before = Duration::ZERO;

        for i in 0..max {
            match operation() {
                Ok(value) => {
                    attempts.push(FetchAttempt {
                        index: i,
                        delay_before,
                        outcome: AttemptOutcome::Success,
                    });
                    if i > 0 {
                        debug!("Request succeeded on attempt {}/{}", i + 1, max);
                    }
                    return FetchReport {
                        result: Ok(Fetched::Data(value)),
                        attempts,
                    };
                }
                Err(e) => {
                    let Some(kind) = e.transient_kind() else {
                        debug!("Fatal error on attempt {}/{}: {}", i + 1, max, e);
                        attempts.push(FetchAttempt {
                            index: i,
                            delay_before,
                            outcome: AttemptOutcome::Fatal,
                        });
                        return FetchReport {
                            result: Err(e),
                            attempts,
                        };
                    };
                    attempts.push(FetchAttempt {
                        index: i,
                        delay_before,
                        outcome: AttemptOutcome::Transient(kind),
                    });

                    let delay = self.policy.delay_for(i);
                    if i + 1 < max {
                        warn!(
                            "Request failed ({}), retrying in {:?}... (attempt {}/{})",
                            e,
                            delay,
                            i + 1,
                            max
                        );
                    } else {
                        warn!(
                            "Request failed ({}), backing off {:?} (attempt {}/{})",
                            e,
                            delay,
                            i + 1,
                            max
                        );
                    }
                    self.sleeper.sleep(delay);
                    delay_before = delay;
                }
            }
        }

        error!(
            "Failed to fetch data after {} attempts. Please try again later.",
            max
        );
        FetchReport {
            result: Ok(Fetched::Unavailable),
            attempts,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::recording_fetcher;
    use super::*;

    fn timeout() -> FetchError {
        FetchError::transient(TransientKind::Timeout, "read timed out")
    }

    #[test]
    fn test_delay_schedule_doubles() {
        let p = RetryPolicy::new(5, Duration::from_secs(3));
        let delays: Vec<u64> = (0..5).map(|i| p.delay_for(i).as_secs()).collect();
        assert_eq!(delays, vec![3, 6, 12, 24, 48]);
        assert_eq!(p.worst_case(), Duration::from_secs(93));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
    }

    #[test]
    fn test_success_after_k_transient_failures() {
        let (fetcher, sleeper) = recording_fetcher(RetryPolicy::new(5, Duration::from_secs(3)));
        let mut calls = 0;
        let got = fetcher
            .fetch(|| {
                calls += 1;
                if calls <= 3 {
                    Err(timeout())
                } else {
                    Ok("payload")
                }
            })
            .unwrap();

        assert_eq!(got, Fetched::Data("payload"));
        assert_eq!(calls, 4);
        // 3 * (1 + 2 + 4)
        assert_eq!(sleeper.total(), Duration::from_secs(21));
    }

    #[test]
    fn test_exhaustion_returns_unavailable_not_error() {
        let (fetcher, sleeper) = recording_fetcher(RetryPolicy::new(5, Duration::from_secs(3)));
        let mut calls = 0;
        let got: Fetched<()> = fetcher
            .fetch(|| {
                calls += 1;
                Err(FetchError::transient(TransientKind::Connection, "reset"))
            })
            .unwrap();

        assert!(got.is_unavailable());
        assert_eq!(calls, 5);
        assert_eq!(sleeper.total(), Duration::from_secs(93));
    }

    #[test]
    fn test_fatal_error_is_not_retried() {
        let (fetcher, sleeper) = recording_fetcher(RetryPolicy::data());
        let mut calls = 0;
        let got: Result<Fetched<()>, _> = fetcher.fetch(|| {
            calls += 1;
            Err(FetchError::malformed("missing resultSets"))
        });

        assert!(matches!(got, Err(FetchError::Malformed(_))));
        assert_eq!(calls, 1);
        assert!(sleeper.calls().is_empty());
    }

    #[test]
    fn test_fatal_after_transient_stops_immediately() {
        let (fetcher, sleeper) = recording_fetcher(RetryPolicy::new(5, Duration::from_millis(10)));
        let mut calls = 0;
        let got: Result<Fetched<()>, _> = fetcher.fetch(|| {
            calls += 1;
            if calls == 1 {
                Err(timeout())
            } else {
                Err(FetchError::Status {
                    status: 400,
                    body: "bad request".into(),
                })
            }
        });

        assert!(matches!(got, Err(FetchError::Status { status: 400, .. })));
        assert_eq!(calls, 2);
        assert_eq!(sleeper.calls(), vec![Duration::from_millis(10)]);
    }

    #[test]
    fn test_traced_attempts_record_delays_and_outcomes() {
        let (fetcher, _) = recording_fetcher(RetryPolicy::new(3, Duration::from_secs(2)));
        let mut calls = 0;
        let report = fetcher
            .fetch_traced(|| {
                calls += 1;
                match calls {
                    1 => Err(FetchError::transient(TransientKind::TooManyRedirects, "loop")),
                    2 => Err(timeout()),
                    _ => Ok(7),
                }
            });

        assert_eq!(report.result.unwrap(), Fetched::Data(7));
        assert_eq!(
            report.attempts,
            vec![
                FetchAttempt {
                    index: 0,
                    delay_before: Duration::ZERO,
                    outcome: AttemptOutcome::Transient(TransientKind::TooManyRedirects),
                },
                FetchAttempt {
                    index: 1,
                    delay_before: Duration::from_secs(2),
                    outcome: AttemptOutcome::Transient(TransientKind::Timeout),
                },
                FetchAttempt {
                    index: 2,
                    delay_before: Duration::from_secs(4),
                    outcome: AttemptOutcome::Success,
                },
            ]
        );
    }

    #[test]
    fn test_traced_fatal_attempt_is_recorded() {
        let (fetcher, sleeper) = recording_fetcher(RetryPolicy::new(5, Duration::from_secs(1)));
        let mut calls = 0;
        let report: FetchReport<()> = fetcher.fetch_traced(|| {
            calls += 1;
            if calls == 1 {
                Err(timeout())
            } else {
                Err(FetchError::malformed("no resultSets"))
            }
        });

        assert!(matches!(report.result, Err(FetchError::Malformed(_))));
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(
            report.attempts[1],
            FetchAttempt {
                index: 1,
                delay_before: Duration::from_secs(1),
                outcome: AttemptOutcome::Fatal,
            }
        );
        assert_eq!(sleeper.calls(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn test_fetched_and_then_passes_unavailable_through() {
        let u: Fetched<i32> = Fetched::Unavailable;
        let r: Result<Fetched<i32>, String> = u.and_then(|v| Ok(v + 1));
        assert_eq!(r, Ok(Fetched::Unavailable));

        let d = Fetched::Data(1).and_then(|v| Ok::<_, String>(v + 1));
        assert_eq!(d, Ok(Fetched::Data(2)));
    }
}
