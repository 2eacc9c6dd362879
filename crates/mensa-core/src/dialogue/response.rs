//! Response directives emitted by the engine
//!
//! Each directive carries the data needed to render it. `Display` renders
//! the bot's English text.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FetchErrorKind;
use crate::menu::MenuItem;

/// A templated bot outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Greeting,

    AskForCanteen {
        options: Vec<String>,
    },

    InvalidCanteen {
        input: String,
        options: Vec<String>,
    },

    GotItCheckingCanteen {
        canteen: String,
    },

    CategoriesListing {
        canteen: String,
        date: NaiveDate,
        categories: Vec<String>,
    },

    InvalidCategory {
        input: String,
        available: Vec<String>,
    },

    /// Items of one category, followed by the "another category?" prompt
    CategoryItems {
        canteen: String,
        date: NaiveDate,
        category: String,
        items: Vec<MenuItem>,
        available: Vec<String>,
    },

    FetchError {
        canteen: String,
        date: NaiveDate,
        kind: FetchErrorKind,
        detail: String,
    },

    ParseError {
        canteen: String,
        date: NaiveDate,
        reason: String,
    },

    NoMenuAvailable {
        canteen: String,
        date: NaiveDate,
    },

    DateSet {
        date: NaiveDate,
    },

    AskForDate,

    SessionReset,

    Goodbye,

    Fallback,
}

impl Response {
    /// Stable snake_case name of the directive
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Greeting => "greeting",
            Response::AskForCanteen { .. } => "ask_for_canteen",
            Response::InvalidCanteen { .. } => "invalid_canteen",
            Response::GotItCheckingCanteen { .. } => "got_it_checking_canteen",
            Response::CategoriesListing { .. } => "categories_listing",
            Response::InvalidCategory { .. } => "invalid_category",
            Response::CategoryItems { .. } => "category_items",
            Response::FetchError { .. } => "fetch_error",
            Response::ParseError { .. } => "parse_error",
            Response::NoMenuAvailable { .. } => "no_menu_available",
            Response::DateSet { .. } => "date_set",
            Response::AskForDate => "ask_for_date",
            Response::SessionReset => "session_reset",
            Response::Goodbye => "goodbye",
            Response::Fallback => "fallback",
        }
    }
}

fn or_none(values: &[String]) -> String {
    if values.is_empty() {
        "None available".to_string()
    } else {
        values.join(", ")
    }
}

fn write_item(f: &mut std::fmt::Formatter<'_>, item: &MenuItem) -> std::fmt::Result {
    match item.price_label() {
        Some(price) => writeln!(f, "• {} - {}", item.name, price)?,
        None => writeln!(f, "• {}", item.name)?,
    }
    let allergens = item.allergen_labels();
    if !allergens.is_empty() {
        writeln!(f, "  Allergens: {}", allergens.join(", "))?;
    }
    let additives = item.additive_labels();
    if !additives.is_empty() {
        writeln!(f, "  Additives: {}", additives.join(", "))?;
    }
    Ok(())
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Greeting => write!(
                f,
                "Hi! I can tell you what's on the menu. Which canteen are you interested in?"
            ),
            Response::AskForCanteen { options } => write!(
                f,
                "Which canteen would you like to check? Available options: {}.",
                options.join(", ")
            ),
            Response::InvalidCanteen { options, .. } => write!(
                f,
                "I didn't recognize that canteen. Please choose from: {}.",
                options.join(", ")
            ),
            Response::GotItCheckingCanteen { canteen } => write!(f, "Got it, checking {}.", canteen),
            Response::CategoriesListing {
                canteen,
                date,
                categories,
            } => write!(
                f,
                "Menu for {} on {} has the following categories:\n{}\n\nWhich category would you like to see?",
                canteen,
                date,
                categories.join(", ")
            ),
            Response::InvalidCategory { available, .. } => write!(
                f,
                "I didn't recognize that category. Available categories are: {}",
                or_none(available)
            ),
            Response::CategoryItems {
                category,
                items,
                available,
                ..
            } => {
                writeln!(f, "**{}**", category)?;
                writeln!(f)?;
                for item in items {
                    write_item(f, item)?;
                }
                writeln!(f)?;
                write!(
                    f,
                    "Would you like to see another category? Available: {}",
                    or_none(available)
                )
            }
            Response::FetchError { detail, .. } => {
                write!(f, "Sorry, I couldn't fetch the menu: {}", detail)
            }
            Response::ParseError { reason, .. } => {
                write!(f, "Sorry, I couldn't read the menu: {}", reason)
            }
            Response::NoMenuAvailable { canteen, date } => {
                write!(f, "No menu available for {} on {}.", canteen, date)
            }
            Response::DateSet { date } => write!(f, "Setting menu date to {}.", date),
            Response::AskForDate => write!(
                f,
                "Please provide a date in YYYY-MM-DD format (e.g., 2026-01-22)."
            ),
            Response::SessionReset => write!(f, "Alright, let's start over."),
            Response::Goodbye => write!(f, "Bye! Enjoy your meal."),
            Response::Fallback => write!(
                f,
                "Sorry, I didn't get that. You can ask me what's on the menu at a canteen."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::parse_price_tiers;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 22).unwrap()
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(Response::NoMenuAvailable {
            canteen: "Marchstrasse".to_string(),
            date: date(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "no_menu_available", "canteen": "Marchstrasse", "date": "2026-01-22"})
        );
        assert_eq!(serde_json::to_value(Response::Goodbye).unwrap(), serde_json::json!({"type": "goodbye"}));
    }

    #[test]
    fn test_kind_matches_tag() {
        let response = Response::InvalidCategory {
            input: "soups".to_string(),
            available: vec!["Suppen".to_string()],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], response.kind());
    }

    #[test]
    fn test_render_listing() {
        let text = Response::CategoriesListing {
            canteen: "Hardenbergstrasse".to_string(),
            date: date(),
            categories: vec!["Suppen".to_string(), "Desserts".to_string()],
        }
        .to_string();
        assert!(text.starts_with("Menu for Hardenbergstrasse on 2026-01-22"));
        assert!(text.contains("Suppen, Desserts"));
    }

    #[test]
    fn test_render_category_items() {
        let item = MenuItem::new("Porridge mit Mandeln")
            .with_prices(parse_price_tiers("€ 1,25/1,45/1,65"))
            .with_allergen("21d")
            .with_allergen("26a")
            .with_additive("7");
        let text = Response::CategoryItems {
            canteen: "Vegan Mensa".to_string(),
            date: date(),
            category: "Desserts".to_string(),
            items: vec![item, MenuItem::new("Obstsalat")],
            available: vec!["Desserts".to_string(), "Salate".to_string()],
        }
        .to_string();

        assert!(text.contains("**Desserts**"));
        assert!(text.contains("• Porridge mit Mandeln - € 1,25/1,45/1,65"));
        assert!(text.contains("  Allergens: Oats, Almonds"));
        assert!(text.contains("  Additives: Antioxidants"));
        assert!(text.contains("• Obstsalat\n"));
        assert!(text.ends_with("Available: Desserts, Salate"));
    }

    #[test]
    fn test_render_invalid_category_without_options() {
        let text = Response::InvalidCategory {
            input: "x".to_string(),
            available: vec![],
        }
        .to_string();
        assert!(text.ends_with("None available"));
    }
}
