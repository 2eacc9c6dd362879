//! Canteen table and resolver
//!
//! Maps free-text canteen mentions (display name, alias or canonical id) to
//! the provider's `resources_id`. Matching is exact after trimming and
//! lowercasing; there is no fuzzy matching.

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Canonical canteen identifier, identical to the provider's `resources_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanteenId(pub String);

impl CanteenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanteenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configured canteen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canteen {
    /// Canonical id (`resources_id`)
    pub id: CanteenId,

    /// Name shown to users
    pub display_name: String,

    /// Case-insensitive aliases
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Canteen {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: CanteenId::new(id),
            display_name: display_name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Whether the already-normalized input names this canteen
    fn matches(&self, normalized: &str) -> bool {
        self.display_name.to_lowercase() == normalized
            || self.id.as_str() == normalized
            || self.aliases.iter().any(|a| a.trim().to_lowercase() == normalized)
    }
}

/// Static canteen table with lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanteenRegistry {
    canteens: Vec<Canteen>,
}

impl Default for CanteenRegistry {
    fn default() -> Self {
        Self::new(vec![
            Canteen::new("1004", "Hardenbergstrasse")
                .with_alias("hardenberg")
                .with_alias("hardenbergstrasse")
                .with_alias("hardenbergstraße"),
            Canteen::new("1010", "Marchstrasse")
                .with_alias("march")
                .with_alias("marchstrasse")
                .with_alias("marchstraße"),
            Canteen::new("2456", "Vegan Mensa")
                .with_alias("vegan")
                .with_alias("veggie"),
        ])
    }
}

impl CanteenRegistry {
    pub fn new(canteens: Vec<Canteen>) -> Self {
        Self { canteens }
    }

    /// Resolve a free-text mention; first exact match wins
    pub fn resolve(&self, text: Option<&str>) -> Option<&Canteen> {
        let normalized = text?.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        self.canteens.iter().find(|c| c.matches(&normalized))
    }

    /// Like [`resolve`](Self::resolve), but reports the miss as an error
    pub fn try_resolve(&self, text: &str) -> Result<&Canteen, ResolveError> {
        self.resolve(Some(text))
            .ok_or_else(|| ResolveError::InvalidCanteen(text.to_string()))
    }

    /// Look up a canteen by canonical id
    pub fn get(&self, id: &CanteenId) -> Option<&Canteen> {
        self.canteens.iter().find(|c| &c.id == id)
    }

    /// Display name for an id, falling back to the raw id
    pub fn display_name(&self, id: &CanteenId) -> String {
        self.get(id)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn display_names(&self) -> Vec<String> {
        self.canteens.iter().map(|c| c.display_name.clone()).collect()
    }

    pub fn canteens(&self) -> &[Canteen] {
        &self.canteens
    }

    pub fn len(&self) -> usize {
        self.canteens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canteens.is_empty()
    }
}
