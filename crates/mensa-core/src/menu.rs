//! Structured menu model
//!
//! A [`Menu`] is what the parser produces from a provider document and what a
//! session caches between turns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::annotations;
use crate::canteen::CanteenId;
use crate::date::ISO_DATE_FORMAT;

/// Identifies a unique provider fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuQuery {
    pub canteen: CanteenId,
    pub date: NaiveDate,
}

impl MenuQuery {
    pub fn new(canteen: CanteenId, date: NaiveDate) -> Self {
        Self { canteen, date }
    }

    /// Date in the provider's `YYYY-MM-DD` form
    pub fn date_param(&self) -> String {
        self.date.format(ISO_DATE_FORMAT).to_string()
    }
}

impl std::fmt::Display for MenuQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.canteen, self.date_param())
    }
}

/// One price tier, in minor currency units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTier {
    pub amount_cents: u32,
    pub currency: String,
}

impl PriceTier {
    pub fn eur(amount_cents: u32) -> Self {
        Self {
            amount_cents,
            currency: "EUR".to_string(),
        }
    }

    /// Amount in the provider's decimal-comma notation, e.g. `1,95`
    pub fn amount_label(&self) -> String {
        format!("{},{:02}", self.amount_cents / 100, self.amount_cents % 100)
    }

    fn symbol(&self) -> &str {
        match self.currency.as_str() {
            "EUR" => "€",
            other => other,
        }
    }
}

/// Parse a provider price label such as `€ 1,95/2,15/2,35`.
///
/// Only text carrying a euro sign is considered a price. Tiers that do not
/// parse as a decimal amount are dropped individually.
pub fn parse_price_tiers(text: &str) -> Vec<PriceTier> {
    if !text.contains('€') {
        return Vec::new();
    }

    text.replace('€', " ")
        .split('/')
        .filter_map(parse_amount_cents)
        .map(PriceTier::eur)
        .collect()
}

fn parse_amount_cents(raw: &str) -> Option<u32> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }

    let (whole, fraction) = match cleaned.split_once([',', '.']) {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };

    if whole.is_empty()
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
        || fraction.len() > 2
    {
        return None;
    }

    let euros: u32 = whole.parse().ok()?;
    let cents: u32 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u32>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    euros.checked_mul(100)?.checked_add(cents)
}

/// A single dish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,

    /// Ordered price tiers (students, employees, guests)
    #[serde(default)]
    pub prices: Vec<PriceTier>,

    /// Raw allergen codes, provider order, no duplicates
    #[serde(default)]
    pub allergens: Vec<String>,

    /// Raw additive codes, provider order, no duplicates
    #[serde(default)]
    pub additives: Vec<String>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prices: Vec::new(),
            allergens: Vec::new(),
            additives: Vec::new(),
        }
    }

    pub fn with_prices(mut self, prices: Vec<PriceTier>) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_allergen(mut self, code: impl Into<String>) -> Self {
        push_unique(&mut self.allergens, code.into());
        self
    }

    pub fn with_additive(mut self, code: impl Into<String>) -> Self {
        push_unique(&mut self.additives, code.into());
        self
    }

    /// Price label in provider style, `None` when the item has no prices
    pub fn price_label(&self) -> Option<String> {
        let first = self.prices.first()?;
        let amounts: Vec<String> = self.prices.iter().map(PriceTier::amount_label).collect();
        Some(format!("{} {}", first.symbol(), amounts.join("/")))
    }

    pub fn allergen_labels(&self) -> Vec<&'static str> {
        self.allergens
            .iter()
            .filter_map(|c| annotations::allergen_label(c))
            .collect()
    }

    pub fn additive_labels(&self) -> Vec<&'static str> {
        self.additives
            .iter()
            .filter_map(|c| annotations::additive_label(c))
            .collect()
    }
}

pub(crate) fn push_unique(codes: &mut Vec<String>, code: String) {
    if !codes.contains(&code) {
        codes.push(code);
    }
}

/// A named group of dishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub items: Vec<MenuItem>,
}

impl Category {
    pub fn new(name: impl Into<String>, items: Vec<MenuItem>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A parsed menu for one canteen and day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub query: MenuQuery,
    pub categories: Vec<Category>,
}

impl Menu {
    pub fn new(query: MenuQuery, categories: Vec<Category>) -> Self {
        Self { query, categories }
    }

    /// True when there is nothing to show ("no menu available")
    pub fn is_empty(&self) -> bool {
        self.categories.iter().all(Category::is_empty)
    }

    /// Names of the non-empty categories, in menu order
    pub fn category_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Case-insensitive exact lookup of a non-empty category
    pub fn find_category(&self, name: &str) -> Option<&Category> {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.categories
            .iter()
            .filter(|c| !c.is_empty())
            .find(|c| c.name.to_lowercase() == wanted)
    }

    pub fn item_count(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }
}
