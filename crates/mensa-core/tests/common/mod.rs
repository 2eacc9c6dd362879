//! Test doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use mensa_core::{FetchError, MenuFetcher, MenuQuery};
use parking_lot::Mutex;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 21).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Render a provider document with the given categories and dish names
pub fn menu_html(categories: &[(&str, &[&str])]) -> String {
    let mut html = String::from("<div class=\"container-fluid splBlock\">");
    for (name, dishes) in categories {
        html.push_str("<div class=\"row splGroupWrapper\">");
        html.push_str(&format!("<div class=\"col-xs-12 splGroup\">{}</div>", name));
        for dish in dishes.iter() {
            html.push_str(&format!(
                "<div class=\"row splMeal\" data-kennz=\"21a\">\
                 <div class=\"col-xs-12 col-md-6\"><span class=\"bold\">{}</span></div>\
                 <div class=\"col-xs-12 col-md-3 text-right\">&euro; 1,95/2,15/2,35</div>\
                 </div>",
                dish
            ));
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

/// Seven-category day as served for Hardenbergstrasse
pub fn hardenberg_menu() -> String {
    menu_html(&[
        ("Vorspeisen", &["Bulgursalat"]),
        ("Salate", &["Große Salatschale"]),
        ("Suppen", &["Linsensuppe"]),
        ("Aktionen", &["Ofenkartoffel"]),
        ("Essen", &["Gemüsecurry", "Spaghetti"]),
        ("Beilagen", &["Reis"]),
        ("Desserts", &["Porridge"]),
    ])
}

pub fn small_menu() -> String {
    menu_html(&[("Suppen", &["Linsensuppe"]), ("Desserts", &["Obstsalat"])])
}

/// Scripted fetcher: one canned answer per canteen id, every call recorded
#[derive(Debug, Default)]
pub struct MockFetcher {
    answers: HashMap<String, Result<String, FetchError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    queries: Mutex<Vec<MenuQuery>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serving(mut self, canteen: &str, body: impl Into<String>) -> Self {
        self.answers.insert(canteen.to_string(), Ok(body.into()));
        self
    }

    pub fn failing(mut self, canteen: &str, error: FetchError) -> Self {
        self.answers.insert(canteen.to_string(), Err(error));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<MenuQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait::async_trait]
impl MenuFetcher for MockFetcher {
    async fn fetch(&self, query: &MenuQuery) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answers
            .get(query.canteen.as_str())
            .cloned()
            .unwrap_or_else(|| Err(FetchError::http(404, format!("HTTP error 404 for canteen {}", query.canteen))))
    }
}
