//! Core review and filter types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single hotel review
///
/// `index` is assigned at load time (1-based, contiguous over the unfiltered
/// table) and never changes, so formatted output can cite `#N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub index: u32,
    pub property_name: String,
    pub rating: i32,
    pub review_date: NaiveDate,
    pub title: Option<String>,
    pub text: Option<String>,
}

impl Review {
    /// Title, or empty string when absent
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Body text, or empty string when absent
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// End before start
    pub fn is_inverted(&self) -> bool {
        self.end < self.start
    }

    /// Both bounds inclusive; an inverted range contains nothing
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Filter criteria rebuilt from user input on every change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub property_name: String,
    pub ratings: BTreeSet<i32>,
    pub date_range: DateRange,
}

impl FilterCriteria {
    pub fn new(
        property_name: impl Into<String>,
        ratings: impl IntoIterator<Item = i32>,
        date_range: DateRange,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            ratings: ratings.into_iter().collect(),
            date_range,
        }
    }

    /// Logical AND of property equality, rating membership and date range
    pub fn matches(&self, review: &Review) -> bool {
        review.property_name == self.property_name
            && self.ratings.contains(&review.rating)
            && self.date_range.contains(review.review_date)
    }
}
