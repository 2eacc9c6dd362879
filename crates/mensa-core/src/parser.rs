//! Menu parser for the provider's day-view HTML
//!
//! The document is a flat list of category wrappers:
//!
//! ```text
//! div.splGroupWrapper
//! ├── div.splGroup                      category heading
//! └── div.splMeal[data-kennz="21a,13"]  one per dish
//!     ├── span.bold                     dish name
//!     └── div.col-xs-12.col-md-3.text-right   "€ 1,95/2,15/2,35"
//! ```

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use crate::annotations::{self, Annotation};
use crate::error::ParseError;
use crate::menu::{parse_price_tiers, push_unique, Category, Menu, MenuItem, MenuQuery};

lazy_static! {
    static ref GROUP_WRAPPER: Selector = selector("div.splGroupWrapper");
    static ref GROUP_HEADING: Selector = selector("div.splGroup");
    static ref MEAL_ROW: Selector = selector("div.splMeal");
    static ref MEAL_NAME: Selector = selector("span.bold");
    static ref MEAL_PRICE: Selector = selector("div.col-xs-12.col-md-3.text-right");
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

/// Attribute holding the comma-separated allergen/additive codes of a row
const ANNOTATION_ATTR: &str = "data-kennz";

/// Parses provider documents into [`Menu`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuParser;

impl MenuParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw document fetched for `query`.
    ///
    /// Categories without dishes are dropped. Fails only when no category
    /// container with a heading exists at all.
    pub fn parse(&self, query: &MenuQuery, raw: &str) -> Result<Menu, ParseError> {
        let document = Html::parse_document(raw);

        let wrappers: Vec<ElementRef<'_>> = document
            .select(&GROUP_WRAPPER)
            .filter(|w| w.select(&GROUP_HEADING).next().is_some())
            .collect();

        if wrappers.is_empty() {
            return Err(ParseError::new(format!(
                "No menu categories found for canteen {} on {}",
                query.canteen,
                query.date_param()
            )));
        }

        let mut categories: Vec<Category> = Vec::new();
        for wrapper in wrappers {
            let Some(category) = parse_category(wrapper) else {
                continue;
            };
            if category.is_empty() {
                tracing::debug!("Dropping empty category {:?}", category.name);
                continue;
            }
            // Headings repeat occasionally, sometimes in another case. Lookup
            // ignores case, so names stay unique ignoring case; the first
            // spelling wins
            let key = category.name.to_lowercase();
            match categories
                .iter_mut()
                .find(|c| c.name.to_lowercase() == key)
            {
                Some(existing) => existing.items.extend(category.items),
                None => categories.push(category),
            }
        }

        tracing::debug!(
            "Parsed menu {} with {} categories",
            query,
            categories.len()
        );
        Ok(Menu::new(query.clone(), categories))
    }
}

fn parse_category(wrapper: ElementRef<'_>) -> Option<Category> {
    let heading = wrapper.select(&GROUP_HEADING).next()?;
    let name = clean_text(heading);
    if name.is_empty() {
        return None;
    }

    let items = wrapper.select(&MEAL_ROW).filter_map(parse_meal).collect();
    Some(Category::new(name, items))
}

fn parse_meal(row: ElementRef<'_>) -> Option<MenuItem> {
    let name = clean_text(row.select(&MEAL_NAME).next()?);
    if name.is_empty() {
        return None;
    }

    let prices = row
        .select(&MEAL_PRICE)
        .next()
        .map(|p| parse_price_tiers(&clean_text(p)))
        .unwrap_or_default();

    let mut item = MenuItem::new(name).with_prices(prices);

    let codes = row.value().attr(ANNOTATION_ATTR).unwrap_or_default();
    for code in codes.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        match annotations::classify(code) {
            Some(Annotation::Allergen(_)) => push_unique(&mut item.allergens, code.to_string()),
            Some(Annotation::Additive(_)) => push_unique(&mut item.additives, code.to_string()),
            None => tracing::trace!("Ignoring unknown annotation code {:?}", code),
        }
    }

    Some(item)
}

/// Element text with all whitespace runs collapsed to single spaces
fn clean_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
