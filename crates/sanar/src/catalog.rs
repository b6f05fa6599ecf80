//! Selector Catalog - semantic element names mapped to selector chains.
//!
//! A catalog decouples *what* a test targets ("login button") from *how* it
//! is found (`#login`, then `[data-testid=login]`, then
//! `button[type=submit]`). Entries are loaded once and never mutated; the
//! catalog is safely shared across scenario workers behind an `Arc` without
//! locking.

use crate::result::{SanarError, SanarResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A named logical UI target with one primary selector and ordered fallbacks.
///
/// Identity is the `name`; it is unique within a catalog. The fallback list
/// may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticElement {
    /// Semantic name, e.g. "loginButton"
    pub name: String,
    /// Primary selector, probed first
    pub primary: String,
    /// Ordered fallback selectors, probed after the primary
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

impl SemanticElement {
    /// Create a new semantic element
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        primary: impl Into<String>,
        fallbacks: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            primary: primary.into(),
            fallbacks: fallbacks.into_iter().map(Into::into).collect(),
        }
    }

    /// Candidate selectors in probe order: primary first, then fallbacks.
    #[must_use]
    pub fn candidates(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(1 + self.fallbacks.len());
        out.push(self.primary.clone());
        out.extend(self.fallbacks.iter().cloned());
        out
    }
}

/// Selector spec as written in catalog files: primary plus fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Primary selector
    pub primary: String,
    /// Ordered fallback selectors
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

/// Read-only mapping from semantic element names to selector chains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorCatalog {
    elements: BTreeMap<String, SemanticElement>,
}

impl SelectorCatalog {
    /// Create an empty catalog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from parsed element specs.
    ///
    /// Later entries replace earlier ones with the same name.
    #[must_use]
    pub fn from_specs(specs: BTreeMap<String, ElementSpec>) -> Self {
        let elements = specs
            .into_iter()
            .map(|(name, spec)| {
                let element = SemanticElement {
                    name: name.clone(),
                    primary: spec.primary,
                    fallbacks: spec.fallbacks,
                };
                (name, element)
            })
            .collect();
        Self { elements }
    }

    /// Parse a catalog from a YAML document shaped
    /// `{ name: { primary: "...", fallbacks: [...] } }`.
    ///
    /// # Errors
    ///
    /// Returns a YAML error if the document does not parse.
    pub fn from_yaml_str(yaml: &str) -> SanarResult<Self> {
        let specs: BTreeMap<String, ElementSpec> = serde_yaml_ng::from_str(yaml)?;
        Ok(Self::from_specs(specs))
    }

    /// Parse a catalog from a JSON document with the same shape as YAML.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the document does not parse.
    pub fn from_json_str(json: &str) -> SanarResult<Self> {
        let specs: BTreeMap<String, ElementSpec> = serde_json::from_str(json)?;
        Ok(Self::from_specs(specs))
    }

    /// Load a catalog from a `.yaml`/`.yml` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file is unreadable, a parse error if its
    /// contents are malformed, or a config error for an unknown extension.
    pub fn from_file(path: impl AsRef<Path>) -> SanarResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(SanarError::Config {
                message: format!(
                    "unsupported catalog format {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                ),
            }),
        }
    }

    /// Look up a semantic element by name.
    ///
    /// # Errors
    ///
    /// Fails with [`SanarError::UnknownElement`] when the name is absent.
    pub fn lookup(&self, name: &str) -> SanarResult<&SemanticElement> {
        self.elements
            .get(name)
            .ok_or_else(|| SanarError::UnknownElement { name: name.into() })
    }

    /// Whether the catalog contains an element with this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Candidate selectors for a target, in probe order.
    ///
    /// A catalog hit expands to `[primary] + fallbacks`; anything else is
    /// treated as a raw selector and returned as the sole candidate.
    #[must_use]
    pub fn candidates(&self, target: &str) -> Vec<String> {
        self.elements.get(target).map_or_else(
            || vec![target.to_string()],
            SemanticElement::candidates,
        )
    }

    /// All element names, in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.elements.keys().map(String::as_str).collect()
    }

    /// Number of elements in the catalog
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the catalog is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Builder for assembling a catalog in code.
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    elements: BTreeMap<String, SemanticElement>,
}

impl CatalogBuilder {
    /// Create a new catalog builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element with a primary selector and ordered fallbacks.
    ///
    /// Later definitions replace earlier ones with the same name.
    #[must_use]
    pub fn with_element(
        mut self,
        name: impl Into<String>,
        primary: impl Into<String>,
        fallbacks: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let element = SemanticElement::new(name, primary, fallbacks);
        let _ = self.elements.insert(element.name.clone(), element);
        self
    }

    /// Finish building the catalog
    #[must_use]
    pub fn build(self) -> SelectorCatalog {
        SelectorCatalog {
            elements: self.elements,
        }
    }
}
