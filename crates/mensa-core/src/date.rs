//! Date resolution for menu lookups
//!
//! "Now" is always supplied by the caller, never read from a clock here.

use chrono::{Days, NaiveDate};

use crate::error::ResolveError;

/// Format used by the provider and by explicit user dates
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Resolves date entities relative to an explicit "today"
#[derive(Debug, Clone, Copy, Default)]
pub struct DateResolver;

impl DateResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a date entity; absent input means `today`
    pub fn resolve(&self, text: Option<&str>, today: NaiveDate) -> Result<NaiveDate, ResolveError> {
        let Some(raw) = text else {
            return Ok(today);
        };

        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Ok(today);
        }

        if let Some(offset) = relative_offset(&normalized) {
            return shift(today, offset).ok_or_else(|| ResolveError::InvalidDate(raw.to_string()));
        }

        NaiveDate::parse_from_str(&normalized, ISO_DATE_FORMAT)
            .map_err(|_| ResolveError::InvalidDate(raw.to_string()))
    }

    /// Resolve, falling back to `today` when the expression is malformed
    pub fn resolve_or_today(&self, text: Option<&str>, today: NaiveDate) -> NaiveDate {
        match self.resolve(text, today) {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!("{}, falling back to {}", e, today);
                today
            }
        }
    }
}

fn relative_offset(term: &str) -> Option<i64> {
    match term {
        "today" | "heute" => Some(0),
        "tomorrow" | "morgen" => Some(1),
        "day after tomorrow" | "übermorgen" | "uebermorgen" => Some(2),
        "yesterday" | "gestern" => Some(-1),
        _ => None,
    }
}

fn shift(date: NaiveDate, offset: i64) -> Option<NaiveDate> {
    let days = Days::new(offset.unsigned_abs());
    if offset >= 0 {
        date.checked_add_days(days)
    } else {
        date.checked_sub_days(days)
    }
}
