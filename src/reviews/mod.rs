//! Review data pipeline
//!
//! Loading, filtering, signature and combination of hotel reviews.

pub mod combiner;
pub mod dataset;
pub mod filter;
pub mod signature;
pub mod types;

// Re-export commonly used types
pub use combiner::{
    format_review, requires_explicit_combine, CombinedReviewBlock, ReviewCombiner,
    AUTO_COMBINE_LIMIT,
};
pub use dataset::{parse_date, parse_rating, ReviewTable};
pub use filter::filter_reviews;
pub use signature::FilterSignature;
pub use types::{DateRange, FilterCriteria, Review};
