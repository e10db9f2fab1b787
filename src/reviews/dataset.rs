//! Review dataset loading
//!
//! Reads the delimited review file once per session. Bytes are decoded as
//! UTF-8 when valid and as ISO-8859-1 otherwise, matching how the source
//! export is encoded. Rows receive a stable 1-based index in file order.

use crate::errors::{AnalyzerError, Result};
use crate::reviews::types::{DateRange, Review};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Accepted review date layouts, tried in order
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%d %B %Y", "%B %d, %Y", "%d %b %Y"];

/// Raw CSV row; extra columns are ignored
#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(rename = "Property Name")]
    property_name: String,
    #[serde(rename = "Review Rating")]
    rating: String,
    #[serde(rename = "Date Of Review")]
    review_date: String,
    #[serde(rename = "Review Title", default)]
    title: Option<String>,
    #[serde(rename = "Review Text", default)]
    text: Option<String>,
}

/// The full, read-only review table
#[derive(Debug, Clone, Default)]
pub struct ReviewTable {
    reviews: Vec<Review>,
}

impl ReviewTable {
    /// Build a table from already-indexed reviews
    pub fn new(reviews: Vec<Review>) -> Self {
        Self { reviews }
    }

    /// Load from a CSV file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            AnalyzerError::DatasetError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let table = Self::from_bytes(&bytes)?;
        tracing::info!(path = %path.display(), rows = table.len(), "dataset loaded");
        Ok(table)
    }

    /// Parse CSV content
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let content = decode(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());

        let mut reviews = Vec::new();
        for (i, row) in reader.deserialize::<RawReview>().enumerate() {
            let index = (i + 1) as u32;
            let raw = row?;
            reviews.push(Review {
                index,
                property_name: raw.property_name.trim().to_string(),
                rating: parse_rating(&raw.rating).ok_or_else(|| {
                    AnalyzerError::DatasetError(format!(
                        "Row {}: invalid rating '{}'",
                        index, raw.rating
                    ))
                })?,
                review_date: parse_date(&raw.review_date).ok_or_else(|| {
                    AnalyzerError::DatasetError(format!(
                        "Row {}: invalid date '{}'",
                        index, raw.review_date
                    ))
                })?,
                title: raw.title,
                text: raw.text,
            });
        }

        Ok(Self { reviews })
    }

    /// All rows in original order
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    /// Distinct property names in first-seen order
    pub fn property_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.reviews
            .iter()
            .filter(|r| seen.insert(r.property_name.as_str()))
            .map(|r| r.property_name.clone())
            .collect()
    }

    /// Review count per property, in first-seen order
    pub fn property_counts(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for review in &self.reviews {
            *counts.entry(review.property_name.as_str()).or_default() += 1;
        }
        self.property_names()
            .into_iter()
            .map(|name| {
                let count = counts.get(name.as_str()).copied().unwrap_or(0);
                (name, count)
            })
            .collect()
    }

    /// Sorted distinct ratings
    pub fn ratings(&self) -> Vec<i32> {
        self.reviews
            .iter()
            .map(|r| r.rating)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest review dates
    pub fn date_bounds(&self) -> Option<DateRange> {
        let min = self.reviews.iter().map(|r| r.review_date).min()?;
        let max = self.reviews.iter().map(|r| r.review_date).max()?;
        Some(DateRange::new(min, max))
    }

    /// Whether a property exists in the dataset
    pub fn has_property(&self, name: &str) -> bool {
        self.reviews.iter().any(|r| r.property_name == name)
    }
}

/// Decode as UTF-8, falling back to ISO-8859-1
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1 maps each byte to the code point of the same value
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Parse an integer rating, tolerating a `.0` suffix
pub fn parse_rating(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i32>() {
        return Some(value);
    }
    let value = trimmed.parse::<f64>().ok()?;
    (value.fract() == 0.0).then_some(value as i32)
}

/// Parse a review date in any accepted layout
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}
