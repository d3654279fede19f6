//! Core data models.
//!
//! A run turns a [`AnalysisRequest`] into a [`ResultsTable`]: one
//! [`ResultRow`] per discovered shopper query, in discovery order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Stored in `ai_context` when a failure renders to an empty description.
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Whether the target brand was found in the model's answer for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Presence {
    Yes,
    No,
    Error,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Yes => "Yes",
            Presence::No => "No",
            Presence::Error => "Error",
        }
    }
}

impl fmt::Display for Presence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub query: String,
    pub brand_present: Presence,
    pub ai_context: String,
}

impl ResultRow {
    pub fn checked(query: impl Into<String>, present: bool, ai_context: String) -> Self {
        Self {
            query: query.into(),
            brand_present: if present { Presence::Yes } else { Presence::No },
            ai_context: non_empty(ai_context),
        }
    }

    pub fn failed(query: impl Into<String>, description: String) -> Self {
        Self {
            query: query.into(),
            brand_present: Presence::Error,
            ai_context: non_empty(description),
        }
    }
}

fn non_empty(text: String) -> String {
    if text.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        text
    }
}

/// The output of a single run. Never merged with another run's table.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsTable {
    pub brand_name: String,
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ResultRow>,
}

impl ResultsTable {
    pub fn new(brand_name: impl Into<String>, rows: Vec<ResultRow>) -> Self {
        Self {
            brand_name: brand_name.into(),
            generated_at: Utc::now(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The brand being tracked.
#[derive(Debug, Clone)]
pub struct Brand {
    pub name: String,
    /// Collected for display; not used when matching.
    pub domain: String,
    pub aliases: Vec<String>,
}

/// Where the category list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMode {
    Preset,
    Manual,
}

impl CategoryMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preset" => Some(CategoryMode::Preset),
            "manual" => Some(CategoryMode::Manual),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryMode::Preset => "preset",
            CategoryMode::Manual => "manual",
        }
    }
}

/// Everything a run needs, read at trigger time.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub api_key: Option<String>,
    pub brand: Brand,
    pub market: String,
    pub category_mode: CategoryMode,
    /// Comma-separated category list.
    pub categories: String,
    pub queries_per_category: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_displays_exact_labels() {
        assert_eq!(Presence::Yes.to_string(), "Yes");
        assert_eq!(Presence::No.to_string(), "No");
        assert_eq!(Presence::Error.to_string(), "Error");
    }

    #[test]
    fn failed_row_never_has_empty_context() {
        let row = ResultRow::failed("q", String::new());
        assert_eq!(row.brand_present, Presence::Error);
        assert_eq!(row.ai_context, UNKNOWN_ERROR);
    }

    #[test]
    fn checked_row_maps_flag() {
        let row = ResultRow::checked("q", true, "text".to_string());
        assert_eq!(row.brand_present, Presence::Yes);
        let row = ResultRow::checked("q", false, "text".to_string());
        assert_eq!(row.brand_present, Presence::No);
    }

    #[test]
    fn category_mode_parses_form_values() {
        assert_eq!(CategoryMode::parse("preset"), Some(CategoryMode::Preset));
        assert_eq!(CategoryMode::parse("manual"), Some(CategoryMode::Manual));
        assert_eq!(CategoryMode::parse("other"), None);
    }
}
