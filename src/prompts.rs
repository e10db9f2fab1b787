//! Default prompts and usage text

/// Default main prompt, editable per session
pub const DEFAULT_MAIN_PROMPT: &str = "\
Analyze the hotel reviews below. Summarize the most common complaints and \
the most common praise, each as a short bulleted list ordered by how often \
it comes up. Cite supporting reviews by their number (for example #12). \
Finish with three concrete recommendations for the hotel management.";

/// Default system prompt, sent before the main prompt
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an experienced hospitality analyst. You read guest reviews carefully \
and report only what the reviews actually say. Be concise and specific, use \
Markdown formatting, and never invent reviews or details that are not in the \
provided data.";

/// One-paragraph description shown in the banner
pub const MAIN_CAPTION: &str = "\
Filter hotel reviews and analyze them with one of two large language models \
(GPT-4 Turbo or Mistral 7B).";

/// Step-by-step usage shown by /help
pub const USAGE_CAPTION: &str = "\
1. Filter reviews with /property, /ratings and /dates.
2. Combine reviews with /combine when the filter matches 50 or more rows;
   smaller result sets are combined automatically.
   Combined reviews must stay under 50,000 tokens for GPT-4 Turbo and
   under 30,000 tokens for Mistral 7B.
3. Pick a model with /model and edit the prompts with /prompt and /system.
4. Run /analyze and read the streamed result; /result shows it again.
5. /reset restores the default prompts and clears everything else.";

/// Join the main prompt with the combined review data
pub fn build_user_prompt(main_prompt: &str, combined_reviews: &str) -> String {
    format!("{}\n\nReview data:\n\n{}", main_prompt, combined_reviews)
}
