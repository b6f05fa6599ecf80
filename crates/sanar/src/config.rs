//! Configuration surface - explicit structs, no process-wide state.
//!
//! Global settings plus per-site element tables, loadable from YAML or
//! JSON. Defaults mirror the retry/heal plugin settings this crate's
//! behavior was distilled from: three total attempts, a 2 s retry delay, a
//! 15 s resolution budget, and at most three healing suggestions.

use crate::catalog::{ElementSpec, SelectorCatalog};
use crate::result::{SanarError, SanarResult};
use crate::retry::Backoff;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default total attempts per step (one run plus two retries)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay between retry attempts (2 seconds)
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

/// Default total resolution budget (15 seconds)
pub const DEFAULT_RESOLUTION_TIMEOUT_MS: u64 = 15_000;

/// Default cap on healing suggestions per failed element
pub const DEFAULT_HEAL_LIMIT: usize = 3;

/// Cap for a single exponential-backoff delay (30 seconds)
pub const BACKOFF_CAP_MS: u64 = 30_000;

/// Global resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Total attempts per step, including the first (must be >= 1)
    pub max_attempts: u32,
    /// Delay between retry attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Total resolution budget in milliseconds (must be > 0)
    pub resolution_timeout_ms: u64,
    /// Double the retry delay per attempt instead of keeping it constant
    pub exponential_backoff: bool,
    /// Maximum healing suggestions requested per failed element
    pub heal_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            resolution_timeout_ms: DEFAULT_RESOLUTION_TIMEOUT_MS,
            exponential_backoff: false,
            heal_limit: DEFAULT_HEAL_LIMIT,
        }
    }
}

impl ResolverConfig {
    /// Create a config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set total attempts per step
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the retry delay in milliseconds
    #[must_use]
    pub const fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Set the total resolution budget in milliseconds
    #[must_use]
    pub const fn with_resolution_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.resolution_timeout_ms = timeout_ms;
        self
    }

    /// Switch between constant and exponential retry delay
    #[must_use]
    pub const fn with_exponential_backoff(mut self, exponential: bool) -> Self {
        self.exponential_backoff = exponential;
        self
    }

    /// Set the healing suggestion cap
    #[must_use]
    pub const fn with_heal_limit(mut self, heal_limit: usize) -> Self {
        self.heal_limit = heal_limit;
        self
    }

    /// Check the value ranges the resolver depends on.
    ///
    /// # Errors
    ///
    /// Fails with a config error when `max_attempts` is zero or the
    /// resolution budget is zero.
    pub fn validate(&self) -> SanarResult<()> {
        if self.max_attempts < 1 {
            return Err(SanarError::Config {
                message: "max_attempts must be >= 1".into(),
            });
        }
        if self.resolution_timeout_ms == 0 {
            return Err(SanarError::Config {
                message: "resolution_timeout_ms must be > 0".into(),
            });
        }
        Ok(())
    }

    /// Resolution budget as a `Duration`
    #[must_use]
    pub const fn resolution_timeout(&self) -> Duration {
        Duration::from_millis(self.resolution_timeout_ms)
    }

    /// Retry delay as a `Duration`
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Delay strategy derived from this config.
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        if self.exponential_backoff {
            Backoff::Exponential {
                base: Duration::from_millis(self.retry_delay_ms),
                cap: Duration::from_millis(BACKOFF_CAP_MS),
            }
        } else {
            Backoff::Fixed {
                delay: Duration::from_millis(self.retry_delay_ms),
            }
        }
    }
}

/// Full configuration file: global settings plus per-site element tables.
///
/// ```yaml
/// settings:
///   max_attempts: 3
///   retry_delay_ms: 2000
/// sites:
///   facebook:
///     loginButton:
///       primary: "[data-testid=\"royal-login-button\"]"
///       fallbacks: ["[name=\"login\"]", "button[type=submit]"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Global resolver settings
    #[serde(default)]
    pub settings: ResolverConfig,
    /// Element tables keyed by site name
    #[serde(default)]
    pub sites: BTreeMap<String, BTreeMap<String, ElementSpec>>,
}

impl SiteConfig {
    /// Parse and validate a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed YAML or a config error for
    /// out-of-range settings.
    pub fn from_yaml_str(yaml: &str) -> SanarResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.settings.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed JSON or a config error for
    /// out-of-range settings.
    pub fn from_json_str(json: &str) -> SanarResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.settings.validate()?;
        Ok(config)
    }

    /// Load a configuration from a `.yaml`/`.yml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file is unreadable, a parse error if
    /// its contents are malformed, or a config error for an unknown
    /// extension or out-of-range settings.
    pub fn from_file(path: impl AsRef<Path>) -> SanarResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(SanarError::Config {
                message: format!(
                    "unsupported config format {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                ),
            }),
        }
    }

    /// Build the selector catalog for one site.
    ///
    /// # Errors
    ///
    /// Fails with a config error when the site is not defined.
    pub fn catalog_for(&self, site: &str) -> SanarResult<SelectorCatalog> {
        let specs = self.sites.get(site).ok_or_else(|| SanarError::Config {
            message: format!("site '{site}' not defined in configuration"),
        })?;
        Ok(SelectorCatalog::from_specs(specs.clone()))
    }

    /// All configured site names, in sorted order.
    #[must_use]
    pub fn site_names(&self) -> Vec<&str> {
        self.sites.keys().map(String::as_str).collect()
    }
}
