use crate::models::{DomainMode, SummaryMap};
use crate::ServiceError;

pub const REVIEW_WORD_LIMIT: usize = 400;
pub const HEALTH_CHECK_PROMPT: &str = "Say hello in 3 words.";

fn summaries_json(summaries: &SummaryMap) -> Result<String, ServiceError> {
    Ok(serde_json::to_string_pretty(summaries)?)
}

pub fn comparison_prompt(summaries: &SummaryMap) -> Result<String, ServiceError> {
    Ok(format!(
        "
You are an expert research analyst.  Below are short summaries of uploaded papers.

Summaries:
{}

Tasks:
1. Create a markdown table with columns: Document, Methodology, Key Finding, Dataset.
2. Identify any contradictions or conflicting results.
3. List 3-5 **research gaps** not addressed by any paper.

Answer concisely (< 600 tokens).  Use bullet points for gaps.
",
        summaries_json(summaries)?
    ))
}

pub fn gaps_prompt(summaries: &SummaryMap) -> Result<String, ServiceError> {
    Ok(format!(
        "
Identify **research gaps** from these summaries:

{}

Return a markdown bullet list of 3-5 high-impact gaps.
",
        summaries_json(summaries)?
    ))
}

pub fn literature_review_prompt(
    summaries: &SummaryMap,
    mode: DomainMode,
) -> Result<String, ServiceError> {
    Ok(format!(
        "
{}

Write a concise literature review (<= {REVIEW_WORD_LIMIT} words) in markdown based on:

{}

Structure:
- **Introduction**
- **Methods**
- **Results**
- **Discussion**
",
        mode.system_instruction(),
        summaries_json(summaries)?
    ))
}
