//! Review combination
//!
//! Concatenates filtered reviews into one text block and counts its tokens
//! with the tokenizer of the model selected for analysis.
//!
//! Per review, in order:
//!
//! ```text
//! ###### #<index> - Title: <title>\n\n<text>\n\n
//! ```
//!
//! Missing title or text contribute nothing, so the token count reflects
//! only real content.

use crate::context::CountTokens;
use crate::errors::Result;
use crate::models::ModelId;
use crate::reviews::signature::FilterSignature;
use crate::reviews::types::Review;

/// Filtered sets smaller than this are combined automatically
pub const AUTO_COMBINE_LIMIT: usize = 50;

/// Whether a filtered set of `len` rows needs an explicit combine action
pub fn requires_explicit_combine(len: usize, limit: usize) -> bool {
    len >= limit
}

/// Format one review as a block entry
pub fn format_review(review: &Review) -> String {
    format!(
        "###### #{} - Title: {}\n\n{}\n\n",
        review.index,
        review.title_or_empty(),
        review.text_or_empty()
    )
}

/// Combined review text with its token count
///
/// Fields are private: the count is only ever written together with the
/// text and the model whose tokenizer produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedReviewBlock {
    text: String,
    token_count: usize,
    model: ModelId,
    signature: FilterSignature,
    review_count: usize,
}

impl CombinedReviewBlock {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Model whose tokenizer produced `token_count`
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Signature of the filter that produced this block
    pub fn signature(&self) -> &FilterSignature {
        &self.signature
    }

    pub fn review_count(&self) -> usize {
        self.review_count
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Recount the same text with another model's tokenizer
    ///
    /// On error the block keeps its previous count and model.
    pub fn retokenize(&mut self, counter: &dyn CountTokens, model: ModelId) -> Result<()> {
        if model == self.model {
            return Ok(());
        }
        let token_count = counter.count(&self.text, model)?;
        tracing::debug!(
            from = %self.model,
            to = %model,
            before = self.token_count,
            after = token_count,
            "block retokenized"
        );
        self.token_count = token_count;
        self.model = model;
        Ok(())
    }
}

/// Builds [`CombinedReviewBlock`]s
pub struct ReviewCombiner<'a> {
    counter: &'a dyn CountTokens,
}

impl<'a> ReviewCombiner<'a> {
    pub fn new(counter: &'a dyn CountTokens) -> Self {
        Self { counter }
    }

    /// Concatenate `reviews` and count tokens with `model`'s tokenizer
    pub fn combine(
        &self,
        reviews: &[Review],
        model: ModelId,
        signature: FilterSignature,
    ) -> Result<CombinedReviewBlock> {
        let text: String = reviews.iter().map(format_review).collect();
        let token_count = self.counter.count(&text, model)?;

        tracing::info!(
            reviews = reviews.len(),
            tokens = token_count,
            model = %model,
            "reviews combined"
        );

        Ok(CombinedReviewBlock {
            text,
            token_count,
            model,
            signature,
            review_count: reviews.len(),
        })
    }
}
