//! Shopper query discovery.
//!
//! For each category the model is asked for `n` non-branded queries, one
//! per line. The reply is trusted as-is after line splitting and list
//! marker stripping: a category may yield more or fewer than `n` queries.

use anyhow::{Context, Result};

use crate::llm::ChatClient;

/// Split a comma-separated category list, trimming and dropping blanks.
pub fn split_categories(categories: &str) -> Vec<String> {
    categories
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_list_marker(c: char) -> bool {
    c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '•' | '*' | '.' | ')')
}

/// Turn a free-text reply into queries: one per non-blank line, with
/// leading numbering/bullets and surrounding whitespace removed.
pub fn parse_query_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_start_matches(is_list_marker).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn system_prompt(market: &str) -> String {
    format!(
        "You are an AI luxury fashion consultant for the {} market. \
         Focus on high-end, designer-seeking shoppers.",
        market
    )
}

fn user_prompt(market: &str, category: &str, n: usize) -> String {
    format!(
        "Find {} realistic non-branded queries a luxury shopper in {} would ask for: '{}'. One per line.",
        n, market, category
    )
}

/// Generate shopper queries for every category, in category order.
///
/// Any model failure aborts discovery and is returned to the caller.
pub async fn discover_prompts(
    client: &dyn ChatClient,
    market: &str,
    categories: &str,
    n: usize,
) -> Result<Vec<String>> {
    let system = system_prompt(market);
    let mut queries = Vec::new();

    for category in split_categories(categories) {
        let reply = client
            .complete(&system, &user_prompt(market, &category, n))
            .await
            .with_context(|| format!("query discovery failed for category '{}'", category))?;

        let found = parse_query_lines(&reply);
        tracing::debug!(category = %category, count = found.len(), "discovered queries");
        queries.extend(found);
    }

    Ok(queries)
}
