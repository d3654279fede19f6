//! Brand presence checks.
//!
//! Each query is answered by the model as a ranked brand list plus advice.
//! The brand counts as present when its name (or an alias) occurs anywhere
//! in that text, ignoring case. This is the only place where a model
//! failure is absorbed: it becomes an `Error` row instead of aborting the
//! batch.

use crate::llm::ChatClient;
use crate::models::{Brand, ResultRow};

/// Recorded as the error when the model answers a check with nothing.
pub const EMPTY_RESPONSE: &str = "Empty response from OpenAI";

fn system_prompt(market: &str, brand_name: &str) -> String {
    format!(
        "Rank the top 10 luxury designer brands for the query in {}. \
         Format: Rank | Brand | USP. \
         Provide AEO advice for {} to win this query.",
        market, brand_name
    )
}

/// Case-insensitive substring test against the brand name and aliases.
/// Blank needles never match.
pub fn mentions_brand(text: &str, brand: &Brand) -> bool {
    let haystack = text.to_lowercase();
    std::iter::once(&brand.name)
        .chain(brand.aliases.iter())
        .map(|needle| needle.trim().to_lowercase())
        .filter(|needle| !needle.is_empty())
        .any(|needle| haystack.contains(&needle))
}

/// Ask the model about one query and record whether the brand shows up.
pub async fn check_presence(
    client: &dyn ChatClient,
    market: &str,
    query: &str,
    brand: &Brand,
) -> ResultRow {
    let system = system_prompt(market, &brand.name);
    let user = format!("Query: {}", query);

    match client.complete(&system, &user).await {
        Ok(output) if output.is_empty() => {
            tracing::warn!(query = %query, "presence check returned no text");
            ResultRow::failed(query, EMPTY_RESPONSE.to_string())
        }
        Ok(output) => {
            let present = mentions_brand(&output, brand);
            tracing::debug!(query = %query, present, "presence checked");
            ResultRow::checked(query, present, output)
        }
        Err(e) => {
            let description = format!("{:#}", e);
            tracing::warn!(query = %query, error = %description, "presence check failed");
            ResultRow::failed(query, description)
        }
    }
}
