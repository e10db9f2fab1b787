//! Review filtering
//!
//! # Definition
//!
//! ```text
//! filter(T, C) = [ r ∈ T | r.property = C.property
//!                        ∧ r.rating ∈ C.ratings
//!                        ∧ C.start ≤ r.date ≤ C.end ]
//!
//! Order: original table order (stable indices preserved)
//! Empty ratings or end < start: empty result, never an error
//! Complexity: O(n)
//! ```

use crate::reviews::types::{FilterCriteria, Review};

/// Return the reviews matching `criteria`, in table order
pub fn filter_reviews(reviews: &[Review], criteria: &FilterCriteria) -> Vec<Review> {
    if criteria.ratings.is_empty() || criteria.date_range.is_inverted() {
        return Vec::new();
    }

    reviews
        .iter()
        .filter(|review| criteria.matches(review))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::types::DateRange;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn review(index: u32, property: &str, rating: i32, day: u32) -> Review {
        Review {
            index,
            property_name: property.to_string(),
            rating,
            review_date: date(2017, 1, day),
            title: Some(format!("title {}", index)),
            text: Some(format!("text {}", index)),
        }
    }

    fn table() -> Vec<Review> {
        vec![
            review(1, "The Savoy", 1, 5),
            review(2, "Ridgemount Hotel", 1, 6),
            review(3, "The Savoy", 3, 7),
            review(4, "The Savoy", 2, 8),
            review(5, "The Savoy", 1, 20),
        ]
    }

    #[test]
    fn test_and_of_predicates() {
        let criteria = FilterCriteria::new(
            "The Savoy",
            [1, 2],
            DateRange::new(date(2017, 1, 1), date(2017, 1, 10)),
        );
        let result = filter_reviews(&table(), &criteria);
        let indices: Vec<u32> = result.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 4]);
    }

    #[test]
    fn test_preserves_original_index_and_order() {
        let criteria = FilterCriteria::new(
            "The Savoy",
            [1, 2, 3],
            DateRange::new(date(2017, 1, 1), date(2017, 1, 31)),
        );
        let result = filter_reviews(&table(), &criteria);
        let indices: Vec<u32> = result.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_single_day_range() {
        let criteria = FilterCriteria::new(
            "The Savoy",
            [1],
            DateRange::new(date(2017, 1, 20), date(2017, 1, 20)),
        );
        let result = filter_reviews(&table(), &criteria);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].index, 5);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let criteria = FilterCriteria::new(
            "The Savoy",
            [1, 2, 3],
            DateRange::new(date(2017, 1, 31), date(2017, 1, 1)),
        );
        assert!(filter_reviews(&table(), &criteria).is_empty());
    }

    #[test]
    fn test_empty_ratings_is_empty() {
        let criteria = FilterCriteria::new(
            "The Savoy",
            Vec::<i32>::new(),
            DateRange::new(date(2017, 1, 1), date(2017, 1, 31)),
        );
        assert!(filter_reviews(&table(), &criteria).is_empty());
    }

    #[test]
    fn test_property_is_exact_match() {
        let criteria = FilterCriteria::new(
            "the savoy",
            [1, 2, 3],
            DateRange::new(date(2017, 1, 1), date(2017, 1, 31)),
        );
        assert!(filter_reviews(&table(), &criteria).is_empty());
    }
}
