//! Healing Recorder - observability sink for resolution outcomes.
//!
//! Records which fallback (if any) resolved each request so stale primary
//! selectors can be diagnosed without re-running the scenario. The recorder
//! is a best-effort sink: it never fails, and a recorder problem can never
//! change a resolution outcome.

use crate::resolve::ResolutionResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Default in-memory entry capacity before oldest-first eviction
pub const DEFAULT_CAPACITY: usize = 1024;

/// One recorded resolution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingEntry {
    /// Requested element name or raw selector
    pub name: String,
    /// Selector that resolved, if any
    pub resolved_selector: Option<String>,
    /// Position in the probe order when a fallback healed the request
    pub used_fallback_index: Option<usize>,
    /// Number of candidates probed
    pub trail_len: usize,
}

impl HealingEntry {
    /// Whether a fallback selector healed this resolution.
    #[must_use]
    pub const fn healed(&self) -> bool {
        self.used_fallback_index.is_some()
    }

    /// Whether every candidate was exhausted.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.resolved_selector.is_none()
    }
}

/// Per-element aggregate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementStats {
    /// Total resolutions recorded for this element
    pub resolutions: usize,
    /// Resolutions that succeeded via a fallback
    pub healed: usize,
    /// Resolutions that exhausted every candidate
    pub failed: usize,
}

/// Aggregated healing summary for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingReport {
    /// Total resolutions recorded
    pub total: usize,
    /// Resolutions that succeeded via a fallback
    pub healed: usize,
    /// Resolutions that exhausted every candidate
    pub failed: usize,
    /// Per-element breakdown, keyed by element name
    pub per_element: BTreeMap<String, ElementStats>,
}

/// Never-failing sink for resolution outcomes.
///
/// Cheap to clone; clones share the same bounded buffer. Lock poisoning is
/// swallowed: a panicked writer elsewhere degrades recording, never
/// resolution.
#[derive(Debug, Clone)]
pub struct HealingRecorder {
    entries: Arc<Mutex<VecDeque<HealingEntry>>>,
    capacity: usize,
}

impl Default for HealingRecorder {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl HealingRecorder {
    /// Create a recorder with the default capacity
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder holding at most `capacity` entries; older entries
    /// are evicted first.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
        }
    }

    /// Record a resolution outcome.
    ///
    /// Infallible by contract: diagnostics must not change test semantics.
    pub fn record(&self, result: &ResolutionResult) {
        let entry = HealingEntry {
            name: result.requested.clone(),
            resolved_selector: result.resolved_selector.clone(),
            used_fallback_index: result.used_fallback_index,
            trail_len: result.trail.len(),
        };

        if entry.failed() {
            tracing::warn!(
                target: "sanar::healing",
                name = %entry.name,
                trail_len = entry.trail_len,
                "resolution exhausted every candidate"
            );
        } else if entry.healed() {
            tracing::info!(
                target: "sanar::healing",
                name = %entry.name,
                resolved_selector = entry.resolved_selector.as_deref().unwrap_or(""),
                used_fallback_index = entry.used_fallback_index,
                trail_len = entry.trail_len,
                "fallback selector healed resolution"
            );
        } else {
            tracing::debug!(
                target: "sanar::healing",
                name = %entry.name,
                "primary selector resolved"
            );
        }

        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() >= self.capacity {
                let _ = entries.pop_front();
            }
            entries.push_back(entry);
        }
    }

    /// Snapshot of recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<HealingEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Aggregate the recorded entries into a report.
    #[must_use]
    pub fn report(&self) -> HealingReport {
        let mut report = HealingReport::default();
        for entry in self.entries() {
            report.total += 1;
            let stats = report.per_element.entry(entry.name.clone()).or_default();
            stats.resolutions += 1;
            if entry.failed() {
                report.failed += 1;
                stats.failed += 1;
            } else if entry.healed() {
                report.healed += 1;
                stats.healed += 1;
            }
        }
        report
    }

    /// Number of entries currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Whether no entries are held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all recorded entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
