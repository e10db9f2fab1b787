//! Filter signatures
//!
//! A canonical serialization of the live filter and its result size, used to
//! tell whether a combined block or an analysis is stale.

use crate::reviews::types::FilterCriteria;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical filter serialization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSignature(String);

impl FilterSignature {
    /// Serialize `criteria` together with the number of matching reviews
    ///
    /// Ratings come from an ordered set, so the signature does not depend on
    /// the order they were entered in.
    pub fn new(criteria: &FilterCriteria, total_reviews: usize) -> Self {
        let ratings = criteria
            .ratings
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        FilterSignature(format!(
            "Data for Hotel: {} | Ratings: {} | Date Range: {} - {} | Total reviews: {}",
            criteria.property_name,
            ratings,
            criteria.date_range.start.format("%Y-%m-%d"),
            criteria.date_range.end.format("%Y-%m-%d"),
            total_reviews
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
