//! Retry Policy - bounded retries for transient step failures.
//!
//! Wraps a whole test step. Transient failures (element not found,
//! resolution timeout, driver hiccups) are retried with a fixed or
//! exponential delay up to a bounded attempt count; fatal failures
//! (assertion failures, catalog misses, configuration bugs) propagate on
//! first occurrence. One [`RetryOutcome`] is emitted per attempt.

use crate::config::ResolverConfig;
use crate::result::{ErrorKind, SanarError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};

/// Delay strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Constant delay between attempts
    Fixed {
        /// Delay before each retry
        delay: Duration,
    },
    /// Delay doubling per attempt, capped
    Exponential {
        /// Delay before the first retry
        base: Duration,
        /// Upper bound for any single delay
        cap: Duration,
    },
}

impl Backoff {
    /// Delay to apply after the given (1-based) failed attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Exponential { base, cap } => {
                let exponent = attempt.saturating_sub(1).min(16);
                let factor = 2u32.saturating_pow(exponent);
                base.saturating_mul(factor).min(*cap)
            }
        }
    }
}

/// Step lifecycle states.
///
/// `Pending -> Running -> { Succeeded, Retrying, Failed }`; `Retrying`
/// transitions back to `Running` after the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Step has not started
    Pending,
    /// Step is executing
    Running,
    /// Step completed successfully
    Succeeded,
    /// Step failed transiently and will run again
    Retrying,
    /// Step failed terminally
    Failed,
}

/// One retry iteration of a step.
///
/// Attempt numbers are strictly increasing within a step's sequence and
/// bounded by the configured attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOutcome {
    /// 1-based attempt number
    pub attempt: u32,
    /// Failure class, `None` on success
    pub error: Option<ErrorKind>,
    /// Whether another attempt follows
    pub will_retry: bool,
}

/// Successful step completion with its attempt history.
#[derive(Debug)]
pub struct RetryResult<T> {
    /// Value returned by the step
    pub value: T,
    /// Attempts taken, including the successful one
    pub attempts: u32,
    /// Wall-clock time across all attempts and delays
    pub duration: Duration,
    /// One outcome per attempt
    pub outcomes: Vec<RetryOutcome>,
}

/// Terminal step failure with its attempt history.
#[derive(Debug)]
pub struct StepFailure {
    /// The last error observed
    pub last: SanarError,
    /// Attempts made
    pub attempts: u32,
    /// Wall-clock time across all attempts and delays
    pub duration: Duration,
    /// One outcome per attempt
    pub outcomes: Vec<RetryOutcome>,
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "step failed after {} attempt(s) ({:.2}s): {}",
            self.attempts,
            self.duration.as_secs_f64(),
            self.last
        )
    }
}

impl std::error::Error for StepFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}

/// Bounded retry of a fallible async step.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy allowing up to `max_attempts` total attempts
    /// (clamped to at least one).
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Build a policy from the resolver configuration.
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.max_attempts, config.backoff())
    }

    /// Total attempts allowed, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The delay strategy between attempts.
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Run a step, retrying transient failures.
    ///
    /// Fatal errors propagate immediately; transient errors are retried
    /// until the attempt limit, after which the last error is surfaced
    /// wrapped with the full attempt history.
    ///
    /// # Errors
    ///
    /// Returns [`StepFailure`] on a fatal error or once attempts are
    /// exhausted.
    #[allow(unused_assignments)]
    pub async fn run<T, F, Fut>(&self, mut step: F) -> Result<RetryResult<T>, StepFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SanarError>>,
    {
        let started = Instant::now();
        let mut state = RetryState::Pending;
        let mut outcomes = Vec::new();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            state = RetryState::Running;

            match step().await {
                Ok(value) => {
                    state = RetryState::Succeeded;
                    tracing::debug!(
                        target: "sanar::retry",
                        attempt,
                        state = ?state,
                        "step succeeded"
                    );
                    outcomes.push(RetryOutcome {
                        attempt,
                        error: None,
                        will_retry: false,
                    });
                    return Ok(RetryResult {
                        value,
                        attempts: attempt,
                        duration: started.elapsed(),
                        outcomes,
                    });
                }
                Err(error) => {
                    let will_retry = error.is_transient() && attempt < self.max_attempts;
                    state = if will_retry {
                        RetryState::Retrying
                    } else {
                        RetryState::Failed
                    };
                    tracing::warn!(
                        target: "sanar::retry",
                        attempt,
                        kind = %error.kind(),
                        state = ?state,
                        will_retry,
                        "step failed"
                    );
                    outcomes.push(RetryOutcome {
                        attempt,
                        error: Some(error.kind()),
                        will_retry,
                    });
                    if !will_retry {
                        return Err(StepFailure {
                            last: error,
                            attempts: attempt,
                            duration: started.elapsed(),
                            outcomes,
                        });
                    }
                    tokio::time::sleep(self.backoff.delay_for(attempt)).await;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> SanarError {
        SanarError::ElementNotFound {
            name: "loginButton".into(),
            trail: vec![],
        }
    }

    fn fatal() -> SanarError {
        SanarError::AssertionFailed {
            message: "title mismatch".into(),
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Backoff::Fixed {
                delay: Duration::from_millis(10),
            },
        )
    }

    mod backoff_tests {
        use super::*;

        #[test]
        fn test_fixed_delay_constant() {
            let backoff = Backoff::Fixed {
                delay: Duration::from_secs(2),
            };
            assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
            assert_eq!(backoff.delay_for(5), Duration::from_secs(2));
        }

        #[test]
        fn test_exponential_doubles() {
            let backoff = Backoff::Exponential {
                base: Duration::from_secs(1),
                cap: Duration::from_secs(30),
            };
            assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
            assert_eq!(backoff.delay_for(2), Duration::from_secs(2));
            assert_eq!(backoff.delay_for(3), Duration::from_secs(4));
        }

        #[test]
        fn test_exponential_respects_cap() {
            let backoff = Backoff::Exponential {
                base: Duration::from_secs(1),
                cap: Duration::from_secs(8),
            };
            assert_eq!(backoff.delay_for(10), Duration::from_secs(8));
            assert_eq!(backoff.delay_for(32), Duration::from_secs(8));
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_immediate_success_single_outcome() {
            let policy = fast_policy(3);
            let result = policy.run(|| async { Ok::<_, SanarError>(42) }).await.unwrap();
            assert_eq!(result.value, 42);
            assert_eq!(result.attempts, 1);
            assert_eq!(result.outcomes.len(), 1);
            assert_eq!(result.outcomes[0].error, None);
            assert!(!result.outcomes[0].will_retry);
        }

        #[tokio::test(start_paused = true)]
        async fn test_transient_exhausts_exact_attempts() {
            let policy = RetryPolicy::new(
                3,
                Backoff::Fixed {
                    delay: Duration::from_secs(2),
                },
            );
            let calls = Arc::new(AtomicU32::new(0));
            let calls_in_step = calls.clone();

            let failure = policy
                .run(move || {
                    let calls = calls_in_step.clone();
                    async move {
                        let _ = calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(transient())
                    }
                })
                .await
                .unwrap_err();

            assert_eq!(calls.load(Ordering::SeqCst), 3);
            assert_eq!(failure.attempts, 3);
            assert_eq!(failure.outcomes.len(), 3);
            assert!(matches!(failure.last, SanarError::ElementNotFound { .. }));
            assert!(!failure.outcomes[2].will_retry);
        }

        #[tokio::test]
        async fn test_fatal_never_retries() {
            let policy = fast_policy(5);
            let calls = Arc::new(AtomicU32::new(0));
            let calls_in_step = calls.clone();

            let failure = policy
                .run(move || {
                    let calls = calls_in_step.clone();
                    async move {
                        let _ = calls.fetch_add(1, Ordering::SeqCst);
                        Err::<(), _>(fatal())
                    }
                })
                .await
                .unwrap_err();

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(failure.outcomes.len(), 1);
            assert_eq!(
                failure.outcomes[0].error,
                Some(ErrorKind::AssertionFailed)
            );
            assert!(!failure.outcomes[0].will_retry);
        }

        #[tokio::test(start_paused = true)]
        async fn test_eventual_success_after_transient_failures() {
            let policy = RetryPolicy::new(
                5,
                Backoff::Fixed {
                    delay: Duration::from_secs(2),
                },
            );
            let calls = Arc::new(AtomicU32::new(0));
            let calls_in_step = calls.clone();

            let result = policy
                .run(move || {
                    let calls = calls_in_step.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(transient())
                        } else {
                            Ok("resolved")
                        }
                    }
                })
                .await
                .unwrap();

            assert_eq!(result.value, "resolved");
            assert_eq!(result.attempts, 3);
            assert_eq!(result.outcomes.len(), 3);
            assert!(result.outcomes[0].will_retry);
            assert!(result.outcomes[1].will_retry);
            assert_eq!(result.outcomes[2].error, None);
        }

        #[tokio::test]
        async fn test_attempt_numbers_strictly_increase_and_bound() {
            let policy = fast_policy(4);
            let failure = policy
                .run(|| async { Err::<(), _>(transient()) })
                .await
                .unwrap_err();

            let attempts: Vec<u32> =
                failure.outcomes.iter().map(|outcome| outcome.attempt).collect();
            assert_eq!(attempts, vec![1, 2, 3, 4]);
            assert!(attempts.iter().all(|n| *n <= policy.max_attempts()));
        }

        #[tokio::test]
        async fn test_max_attempts_clamped_to_one() {
            let policy = fast_policy(0);
            assert_eq!(policy.max_attempts(), 1);
            let failure = policy
                .run(|| async { Err::<(), _>(transient()) })
                .await
                .unwrap_err();
            assert_eq!(failure.attempts, 1);
        }

        #[tokio::test]
        async fn test_from_config_defaults() {
            let policy = RetryPolicy::from_config(&ResolverConfig::default());
            assert_eq!(policy.max_attempts(), 3);
            assert_eq!(
                policy.backoff(),
                Backoff::Fixed {
                    delay: Duration::from_millis(2000)
                }
            );
        }
    }

    mod failure_display_tests {
        use super::*;

        #[tokio::test]
        async fn test_step_failure_display_and_source() {
            let policy = fast_policy(2);
            let failure = policy
                .run(|| async { Err::<(), _>(transient()) })
                .await
                .unwrap_err();

            let display = failure.to_string();
            assert!(display.contains("2 attempt(s)"));
            assert!(display.contains("loginButton"));
            assert!(std::error::Error::source(&failure).is_some());
        }
    }
}
