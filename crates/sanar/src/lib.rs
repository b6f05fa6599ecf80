//! Sanar: Resilient Selector Resolution for Browser Test Automation
//!
//! Sanar (Spanish: "to heal") locates UI elements through a catalog of
//! semantic names, each mapping to a primary selector plus an ordered
//! fallback chain. When a primary selector goes stale (an A/B change, a
//! redesign), the next candidate heals the lookup deterministically, the
//! outcome is recorded for diagnostics, and the enclosing step can be
//! retried under an explicit policy.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     SANAR Architecture                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Selector   │    │ Resolution │    │ Automation │            │
//! │   │ Catalog    │───►│ Engine     │───►│ Driver     │            │
//! │   │ (static)   │    │            │    │ (trait)    │            │
//! │   └────────────┘    └─────┬──────┘    └────────────┘            │
//! │                          │                                      │
//! │   ┌────────────┐    ┌─────▼──────┐                              │
//! │   │ Retry      │    │ Healing    │                              │
//! │   │ Policy     │    │ Recorder   │                              │
//! │   └────────────┘    └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Browser control is consumed through the [`probe::ElementProbe`] trait
//! and generative-text completion through [`suggest::CompletionClient`];
//! neither is implemented here, and the resolver is fully functional with
//! the completion service absent.
//!
//! # Example
//!
//! ```
//! use sanar::catalog::CatalogBuilder;
//! use sanar::config::ResolverConfig;
//! use sanar::probe::StaticDomProbe;
//! use sanar::resolve::ResolutionEngine;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), sanar::SanarError> {
//! let catalog = CatalogBuilder::new()
//!     .with_element(
//!         "loginButton",
//!         "#login",
//!         ["[data-testid=login]", "button[type=submit]"],
//!     )
//!     .build();
//!
//! let engine = ResolutionEngine::new(Arc::new(catalog), &ResolverConfig::default());
//! let page = StaticDomProbe::with_visible(["[data-testid=login]"]);
//!
//! let result = engine.resolve(&page, "loginButton").await?;
//! assert_eq!(result.resolved_selector.as_deref(), Some("[data-testid=login]"));
//! assert_eq!(result.used_fallback_index, Some(1));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Semantic element catalogs with fallback selector chains
pub mod catalog;
/// Resolver and per-site configuration
pub mod config;
/// Healing outcome recording and reporting
pub mod healing;
/// Automation driver seam and scripted test double
pub mod probe;
/// Ordered candidate resolution with timeout slicing
pub mod resolve;
/// Result and error types
pub mod result;
/// Bounded retry of transient step failures
pub mod retry;
/// Typed selectors and element geometry
pub mod selector;
/// Fallback-selector suggestions from a completion service
pub mod suggest;

pub use catalog::{CatalogBuilder, SelectorCatalog, SemanticElement};
pub use config::{ResolverConfig, SiteConfig};
pub use healing::{HealingRecorder, HealingReport};
pub use probe::ElementProbe;
pub use resolve::{ResolutionAttempt, ResolutionEngine, ResolutionResult};
pub use result::{ErrorKind, SanarError, SanarResult};
pub use retry::{Backoff, RetryOutcome, RetryPolicy, RetryState};
pub use selector::{BoundingBox, Selector};
