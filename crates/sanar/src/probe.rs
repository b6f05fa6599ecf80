//! Element probing - the abstract automation-driver seam.
//!
//! [`ElementProbe`] is the only browser-dependent operation in the crate.
//! Production implementations delegate to a real automation driver (CDP,
//! WebDriver, an in-browser runtime); tests use [`StaticDomProbe`], a
//! scripted document that answers probes without a browser.
//!
//! Both operations are idempotent and non-mutating by contract: probing an
//! element never changes the page.

use crate::result::SanarResult;
use crate::selector::{BoundingBox, Selector};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Capability provider for selector probes against the live document.
#[async_trait]
pub trait ElementProbe: Send + Sync {
    /// Check whether a matching, visible element exists, waiting up to
    /// `timeout` for it to appear.
    ///
    /// # Errors
    ///
    /// Returns a probe error when the underlying driver fails (disconnect,
    /// protocol error). "Not found within the timeout" is `Ok(false)`, not
    /// an error.
    async fn probe_visible(&self, selector: &Selector, timeout: Duration) -> SanarResult<bool>;

    /// Describe the first matching element's geometry, or `None` when the
    /// selector does not currently resolve.
    ///
    /// # Errors
    ///
    /// Returns a probe error when the underlying driver fails.
    async fn describe_element(&self, selector: &Selector) -> SanarResult<Option<BoundingBox>>;
}

/// Scripted document for driving the resolver in tests.
///
/// Holds the set of raw selector strings that currently resolve to a
/// visible element. An optional per-probe latency simulates slow pages so
/// timeout slicing and cancellation are exercisable without a browser.
#[derive(Debug, Clone, Default)]
pub struct StaticDomProbe {
    visible: Arc<RwLock<HashSet<String>>>,
    boxes: Arc<RwLock<HashMap<String, BoundingBox>>>,
    latency: Duration,
    probes: Arc<AtomicUsize>,
}

impl StaticDomProbe {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document where the given raw selectors resolve.
    #[must_use]
    pub fn with_visible(selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let probe = Self::new();
        for selector in selectors {
            probe.set_visible(selector);
        }
        probe
    }

    /// Simulate per-probe latency. A probe whose latency exceeds its
    /// timeout reports the element as absent.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make a selector resolve to a visible element.
    pub fn set_visible(&self, selector: impl Into<String>) {
        if let Ok(mut visible) = self.visible.write() {
            let _ = visible.insert(selector.into());
        }
    }

    /// Remove a selector, simulating a DOM change.
    pub fn remove(&self, selector: &str) {
        if let Ok(mut visible) = self.visible.write() {
            let _ = visible.remove(selector);
        }
    }

    /// Attach a bounding box to a selector.
    pub fn set_bounding_box(&self, selector: impl Into<String>, bbox: BoundingBox) {
        if let Ok(mut boxes) = self.boxes.write() {
            let _ = boxes.insert(selector.into(), bbox);
        }
    }

    /// Number of probes answered so far.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn contains(&self, selector: &Selector) -> bool {
        self.visible
            .read()
            .map(|visible| visible.contains(selector.as_raw()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ElementProbe for StaticDomProbe {
    async fn probe_visible(&self, selector: &Selector, timeout: Duration) -> SanarResult<bool> {
        let _ = self.probes.fetch_add(1, Ordering::SeqCst);
        if self.latency > timeout {
            // Element would not have appeared within this probe's budget.
            tokio::time::sleep(timeout).await;
            return Ok(false);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.contains(selector))
    }

    async fn describe_element(&self, selector: &Selector) -> SanarResult<Option<BoundingBox>> {
        if !self.contains(selector) {
            return Ok(None);
        }
        Ok(self
            .boxes
            .read()
            .ok()
            .and_then(|boxes| boxes.get(selector.as_raw()).copied()))
    }
}
