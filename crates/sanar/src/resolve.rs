//! Resolution Engine - ordered candidate probing with healing fallbacks.
//!
//! Given a semantic name or raw selector, the engine probes the primary
//! selector first, then each fallback in catalog order, each within an even
//! slice of the total time budget. The first candidate that resolves wins;
//! exhaustion fails with the full attempt trail for diagnostics.
//!
//! Fixed-order fallback with even timeout slicing keeps total latency
//! deterministic and bounded no matter how many fallbacks a catalog entry
//! carries. The engine never retries on its own: resolution answers "does
//! this exist", the retry policy answers "try the whole step again".

use crate::catalog::SelectorCatalog;
use crate::config::ResolverConfig;
use crate::healing::HealingRecorder;
use crate::probe::ElementProbe;
use crate::result::{SanarError, SanarResult};
use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Floor for the per-candidate timeout slice (1 second)
pub const MIN_CANDIDATE_TIMEOUT_MS: u64 = 1000;

/// One probed candidate, read-only after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionAttempt {
    /// Candidate selector probed
    pub selector: String,
    /// Whether the candidate resolved to a visible element
    pub succeeded: bool,
    /// Probe duration in milliseconds
    pub elapsed_ms: u64,
}

impl ResolutionAttempt {
    /// Create a new attempt record
    #[must_use]
    pub fn new(selector: impl Into<String>, succeeded: bool, elapsed_ms: u64) -> Self {
        Self {
            selector: selector.into(),
            succeeded,
            elapsed_ms,
        }
    }
}

/// Outcome of one resolution call.
///
/// `used_fallback_index` is the resolved candidate's position in probe
/// order (primary = 0) and is set only when a fallback healed the request;
/// a primary hit leaves it `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Requested element name or raw selector
    pub requested: String,
    /// Selector that resolved, if any
    pub resolved_selector: Option<String>,
    /// Probe-order position of the healing fallback, if one was used
    pub used_fallback_index: Option<usize>,
    /// One attempt per candidate probed, in probe order
    pub trail: Vec<ResolutionAttempt>,
}

impl ResolutionResult {
    /// Whether any candidate resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved_selector.is_some()
    }

    /// Whether a fallback selector healed this resolution.
    #[must_use]
    pub const fn healed(&self) -> bool {
        self.used_fallback_index.is_some()
    }
}

/// Even timeout slice per candidate, floored at
/// [`MIN_CANDIDATE_TIMEOUT_MS`].
///
/// The floor may exceed `timeout / count` for tight budgets; the outer
/// deadline still caps the walk.
#[must_use]
pub fn per_candidate_slice(timeout: Duration, count: usize) -> Duration {
    let count = u32::try_from(count.max(1)).unwrap_or(u32::MAX);
    let even = timeout / count;
    even.max(Duration::from_millis(MIN_CANDIDATE_TIMEOUT_MS))
}

/// Table-driven selector resolution with healing fallbacks.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    catalog: Arc<SelectorCatalog>,
    timeout: Duration,
    recorder: HealingRecorder,
}

impl ResolutionEngine {
    /// Create an engine over a shared catalog, taking its default time
    /// budget from the configuration.
    #[must_use]
    pub fn new(catalog: Arc<SelectorCatalog>, config: &ResolverConfig) -> Self {
        Self {
            catalog,
            timeout: config.resolution_timeout(),
            recorder: HealingRecorder::new(),
        }
    }

    /// Share a recorder with other engines or a reporter.
    #[must_use]
    pub fn with_recorder(mut self, recorder: HealingRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// The recorder receiving every terminal outcome.
    #[must_use]
    pub const fn recorder(&self) -> &HealingRecorder {
        &self.recorder
    }

    /// The catalog backing this engine.
    #[must_use]
    pub fn catalog(&self) -> &SelectorCatalog {
        &self.catalog
    }

    /// Resolve a target within the configured time budget.
    ///
    /// # Errors
    ///
    /// Fails with [`SanarError::ElementNotFound`] when every candidate is
    /// exhausted, or [`SanarError::ResolutionTimeout`] when the budget
    /// expires first.
    pub async fn resolve<P: ElementProbe + ?Sized>(
        &self,
        probe: &P,
        target: &str,
    ) -> SanarResult<ResolutionResult> {
        self.resolve_within(probe, target, self.timeout).await
    }

    /// Resolve a target within an explicit time budget.
    ///
    /// A catalog hit probes `[primary] + fallbacks` in order; an unknown
    /// target is treated as a raw selector with no fallbacks. Expiry of the
    /// budget aborts remaining probes immediately.
    ///
    /// # Errors
    ///
    /// Fails with [`SanarError::ElementNotFound`] when every candidate is
    /// exhausted, or [`SanarError::ResolutionTimeout`] when the budget
    /// expires first.
    pub async fn resolve_within<P: ElementProbe + ?Sized>(
        &self,
        probe: &P,
        target: &str,
        timeout: Duration,
    ) -> SanarResult<ResolutionResult> {
        let candidates = self.catalog.candidates(target);
        let slice = per_candidate_slice(timeout, candidates.len());

        let walk = async {
            let mut trail = Vec::with_capacity(candidates.len());
            for (index, candidate) in candidates.iter().enumerate() {
                let selector = Selector::from_raw(candidate);
                let started = Instant::now();
                let succeeded = match probe.probe_visible(&selector, slice).await {
                    Ok(visible) => visible,
                    Err(error) => {
                        tracing::warn!(
                            target: "sanar::resolve",
                            candidate = %candidate,
                            %error,
                            "probe failed; candidate treated as unresolved"
                        );
                        false
                    }
                };
                trail.push(ResolutionAttempt {
                    selector: candidate.clone(),
                    succeeded,
                    elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                });
                if succeeded {
                    return ResolutionResult {
                        requested: target.to_string(),
                        resolved_selector: Some(candidate.clone()),
                        used_fallback_index: (index > 0).then_some(index),
                        trail,
                    };
                }
            }
            ResolutionResult {
                requested: target.to_string(),
                resolved_selector: None,
                used_fallback_index: None,
                trail,
            }
        };

        match tokio::time::timeout(timeout, walk).await {
            Ok(result) => {
                self.recorder.record(&result);
                if result.is_resolved() {
                    Ok(result)
                } else {
                    Err(SanarError::ElementNotFound {
                        name: target.to_string(),
                        trail: result.trail,
                    })
                }
            }
            Err(_) => {
                tracing::warn!(
                    target: "sanar::resolve",
                    requested = %target,
                    timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "resolution cancelled by total timeout"
                );
                Err(SanarError::ResolutionTimeout {
                    ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::probe::StaticDomProbe;

    const BUDGET: Duration = Duration::from_secs(5);

    fn engine_with(catalog: SelectorCatalog) -> ResolutionEngine {
        ResolutionEngine::new(Arc::new(catalog), &ResolverConfig::default())
    }

    fn login_catalog() -> SelectorCatalog {
        CatalogBuilder::new()
            .with_element(
                "loginButton",
                "#login",
                ["[data-testid=login]", "button[type=submit]"],
            )
            .build()
    }

    mod slicing_tests {
        use super::*;

        #[test]
        fn test_even_split_above_floor() {
            let slice = per_candidate_slice(Duration::from_secs(9), 3);
            assert_eq!(slice, Duration::from_secs(3));
        }

        #[test]
        fn test_floor_wins_for_tight_budgets() {
            let slice = per_candidate_slice(Duration::from_secs(2), 10);
            assert_eq!(slice, Duration::from_millis(MIN_CANDIDATE_TIMEOUT_MS));
        }

        #[test]
        fn test_zero_candidates_treated_as_one() {
            let slice = per_candidate_slice(Duration::from_secs(4), 0);
            assert_eq!(slice, Duration::from_secs(4));
        }

        proptest::proptest! {
            #[test]
            fn prop_slice_bounded_below(timeout_ms in 1u64..120_000, count in 1usize..64) {
                let slice = per_candidate_slice(Duration::from_millis(timeout_ms), count);
                proptest::prop_assert!(slice >= Duration::from_millis(MIN_CANDIDATE_TIMEOUT_MS));
                proptest::prop_assert!(slice >= Duration::from_millis(timeout_ms) / count as u32);
            }

            #[test]
            fn prop_slice_deterministic(timeout_ms in 1u64..120_000, count in 1usize..64) {
                let a = per_candidate_slice(Duration::from_millis(timeout_ms), count);
                let b = per_candidate_slice(Duration::from_millis(timeout_ms), count);
                proptest::prop_assert_eq!(a, b);
            }
        }
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_primary_present_no_fallback_index() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::with_visible(["#login"]);

            let result = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap();
            assert_eq!(result.resolved_selector.as_deref(), Some("#login"));
            assert_eq!(result.used_fallback_index, None);
            assert_eq!(result.trail.len(), 1);
            assert!(!result.healed());
        }

        #[tokio::test]
        async fn test_fallback_heals_with_position_index() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::with_visible(["[data-testid=login]"]);

            let result = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap();
            assert_eq!(
                result.resolved_selector.as_deref(),
                Some("[data-testid=login]")
            );
            assert_eq!(result.used_fallback_index, Some(1));
            assert!(result.trail.len() >= 2);
            assert!(!result.trail[0].succeeded);
            assert!(result.trail[1].succeeded);
        }

        #[tokio::test]
        async fn test_last_fallback_heals() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::with_visible(["button[type=submit]"]);

            let result = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap();
            assert_eq!(result.used_fallback_index, Some(2));
            assert_eq!(result.trail.len(), 3);
        }

        #[tokio::test]
        async fn test_exhaustion_fails_with_full_trail() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::new();

            let err = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap_err();
            match err {
                SanarError::ElementNotFound { name, trail } => {
                    assert_eq!(name, "loginButton");
                    assert_eq!(trail.len(), 3);
                    assert!(trail.iter().all(|attempt| !attempt.succeeded));
                }
                other => panic!("expected ElementNotFound, got {other}"),
            }
        }

        #[tokio::test]
        async fn test_raw_selector_is_sole_candidate() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::with_visible(["#checkout"]);

            let result = engine
                .resolve_within(&probe, "#checkout", BUDGET)
                .await
                .unwrap();
            assert_eq!(result.resolved_selector.as_deref(), Some("#checkout"));
            assert_eq!(result.used_fallback_index, None);
            assert_eq!(result.trail.len(), 1);
        }

        #[tokio::test]
        async fn test_raw_selector_miss_has_single_attempt() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::new();

            let err = engine
                .resolve_within(&probe, "#missing", BUDGET)
                .await
                .unwrap_err();
            match err {
                SanarError::ElementNotFound { trail, .. } => assert_eq!(trail.len(), 1),
                other => panic!("expected ElementNotFound, got {other}"),
            }
        }

        #[tokio::test]
        async fn test_idempotent_against_unchanged_document() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::with_visible(["[data-testid=login]"]);

            let first = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap();
            let second = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap();
            assert_eq!(first.resolved_selector, second.resolved_selector);
            assert_eq!(first.used_fallback_index, second.used_fallback_index);
        }

        #[tokio::test]
        async fn test_default_budget_comes_from_config() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::with_visible(["#login"]);
            let result = engine.resolve(&probe, "loginButton").await.unwrap();
            assert!(result.is_resolved());
        }
    }

    mod cancellation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_total_timeout_aborts_remaining_probes() {
            let catalog = CatalogBuilder::new()
                .with_element("slow", "#a", ["#b", "#c", "#d", "#e"])
                .build();
            let engine = engine_with(catalog);
            let probe = StaticDomProbe::new().with_latency(Duration::from_secs(2));

            let err = engine
                .resolve_within(&probe, "slow", Duration::from_millis(2500))
                .await
                .unwrap_err();
            assert!(matches!(err, SanarError::ResolutionTimeout { ms: 2500 }));
            // Five candidates exist but the deadline fired mid-walk.
            assert!(probe.probe_count() < 5);
        }
    }

    mod recorder_tests {
        use super::*;

        #[tokio::test]
        async fn test_success_is_recorded() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::with_visible(["[data-testid=login]"]);

            let _ = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap();
            let report = engine.recorder().report();
            assert_eq!(report.total, 1);
            assert_eq!(report.healed, 1);
        }

        #[tokio::test]
        async fn test_exhaustion_is_recorded() {
            let engine = engine_with(login_catalog());
            let probe = StaticDomProbe::new();

            let _ = engine.resolve_within(&probe, "loginButton", BUDGET).await;
            let report = engine.recorder().report();
            assert_eq!(report.total, 1);
            assert_eq!(report.failed, 1);
        }

        #[tokio::test]
        async fn test_shared_recorder() {
            let recorder = HealingRecorder::new();
            let engine = engine_with(login_catalog()).with_recorder(recorder.clone());
            let probe = StaticDomProbe::with_visible(["#login"]);

            let _ = engine
                .resolve_within(&probe, "loginButton", BUDGET)
                .await
                .unwrap();
            assert_eq!(recorder.len(), 1);
        }
    }
}
