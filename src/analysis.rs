//! Analysis orchestration.
//!
//! Coordinates one run: credential check → query discovery → one presence
//! check per query, strictly one after another → a [`ResultsTable`].
//!
//! The table is returned to the caller rather than stored anywhere; the
//! HTTP layer decides where it lives (see [`crate::session`]).

use crate::config::{self, LlmConfig};
use crate::discover::{discover_prompts, split_categories};
use crate::llm::{ChatClient, OpenAiChatClient};
use crate::models::{AnalysisRequest, ResultsTable};
use crate::presence::check_presence;
use crate::progress::{AnalysisProgressEvent, AnalysisProgressReporter};
use crate::report::share_of_voice;

/// Why a run did not produce a table.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// No credential was supplied; no model call was made.
    #[error("Please enter your OpenAI API key.")]
    MissingCredential,

    /// The form values cannot be analysed; no model call was made.
    #[error("Invalid settings: {0}")]
    InvalidRequest(String),

    #[error("Failed to prepare the model client: {0:#}")]
    Client(anyhow::Error),

    /// Query discovery failed; the whole run is abandoned.
    #[error("Query discovery failed: {0:#}")]
    Discovery(anyhow::Error),
}

impl AnalysisError {
    /// Configuration problems the user can fix in the form.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingCredential | AnalysisError::InvalidRequest(_)
        )
    }
}

/// Check a request without calling the model. Returns the trimmed key.
pub fn validate_request(request: &AnalysisRequest) -> Result<String, AnalysisError> {
    let api_key = request
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AnalysisError::MissingCredential)?;

    if request.brand.name.trim().is_empty() {
        return Err(AnalysisError::InvalidRequest(
            "brand name must not be empty".to_string(),
        ));
    }

    if !config::is_valid_queries_per_category(request.queries_per_category) {
        return Err(AnalysisError::InvalidRequest(format!(
            "queries per category must be between {} and {}",
            config::MIN_QUERIES_PER_CATEGORY,
            config::MAX_QUERIES_PER_CATEGORY
        )));
    }

    Ok(api_key.to_string())
}

/// Run a full analysis against the configured OpenAI-compatible service.
pub async fn run_analysis(
    llm: &LlmConfig,
    request: &AnalysisRequest,
    progress: &dyn AnalysisProgressReporter,
) -> Result<ResultsTable, AnalysisError> {
    let api_key = validate_request(request)?;
    let client = OpenAiChatClient::new(llm, api_key).map_err(AnalysisError::Client)?;
    run_analysis_with_client(&client, request, progress).await
}

/// Run a full analysis with any [`ChatClient`].
///
/// The credential check still applies: a request without a key is refused
/// before the client is touched.
pub async fn run_analysis_with_client(
    client: &dyn ChatClient,
    request: &AnalysisRequest,
    progress: &dyn AnalysisProgressReporter,
) -> Result<ResultsTable, AnalysisError> {
    validate_request(request)?;

    tracing::info!(
        brand = %request.brand.name,
        mode = request.category_mode.as_str(),
        queries_per_category = request.queries_per_category,
        "starting analysis"
    );

    progress.report(AnalysisProgressEvent::Discovering {
        categories: split_categories(&request.categories).len(),
    });

    let queries = discover_prompts(
        client,
        &request.market,
        &request.categories,
        request.queries_per_category,
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %format!("{:#}", e), "query discovery failed");
        AnalysisError::Discovery(e)
    })?;

    let total = queries.len();
    let mut rows = Vec::with_capacity(total);

    for (i, query) in queries.iter().enumerate() {
        rows.push(check_presence(client, &request.market, query, &request.brand).await);
        progress.report(AnalysisProgressEvent::Evaluating {
            query: query.clone(),
            n: i + 1,
            total,
        });
    }

    let table = ResultsTable::new(request.brand.name.clone(), rows);
    progress.report(AnalysisProgressEvent::Complete {
        rows: table.len(),
        share_of_voice: share_of_voice(&table),
    });

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedClient;
    use crate::models::{Brand, CategoryMode, Presence};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<AnalysisProgressEvent>>);

    impl AnalysisProgressReporter for Recorder {
        fn report(&self, event: AnalysisProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    fn request(categories: &str, n: usize) -> AnalysisRequest {
        AnalysisRequest {
            api_key: Some("sk-test".to_string()),
            brand: Brand {
                name: "Masaba".to_string(),
                domain: "houseofmasaba.com".to_string(),
                aliases: vec![],
            },
            market: "India".to_string(),
            category_mode: CategoryMode::Manual,
            categories: categories.to_string(),
            queries_per_category: n,
        }
    }

    #[tokio::test]
    async fn one_row_per_discovered_query_in_order() {
        let client = ScriptedClient::new(vec![
            Ok("1. designer print saree for haldi\n2. gold foil anarkali price"),
            Ok("1. Masaba | Prints | bold"),
            Ok("1. Sabyasachi | Bridal"),
        ]);
        let recorder = Recorder::default();
        let table = run_analysis_with_client(&client, &request("designer print sarees", 2), &recorder)
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].query, "designer print saree for haldi");
        assert_eq!(table.rows[0].brand_present, Presence::Yes);
        assert_eq!(table.rows[1].brand_present, Presence::No);
        assert_eq!(table.brand_name, "Masaba");

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], AnalysisProgressEvent::Discovering { categories: 1 });
        assert_eq!(events[2].fraction(), Some(1.0));
        assert_eq!(
            events[3],
            AnalysisProgressEvent::Complete {
                rows: 2,
                share_of_voice: Some(50.0)
            }
        );
    }

    #[tokio::test]
    async fn failing_check_is_recorded_and_run_continues() {
        let client = ScriptedClient::new(vec![
            Ok("gold foil anarkali price\nprinted kaftan for brunch"),
            Err("429 Too Many Requests"),
            Ok("Masaba tops this list"),
        ]);
        let table = run_analysis_with_client(&client, &request("anarkalis", 2), &Recorder::default())
            .await
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].query, "gold foil anarkali price");
        assert_eq!(table.rows[0].brand_present, Presence::Error);
        assert_eq!(table.rows[0].ai_context, "429 Too Many Requests");
        assert_eq!(table.rows[1].brand_present, Presence::Yes);
    }

    #[tokio::test]
    async fn missing_credential_makes_no_calls() {
        let client = ScriptedClient::new(vec![Ok("never used")]);
        let mut req = request("sarees", 2);
        req.api_key = Some("   ".to_string());
        let recorder = Recorder::default();

        let err = run_analysis_with_client(&client, &req, &recorder)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingCredential));
        assert!(err.is_configuration_error());
        assert_eq!(client.call_count(), 0);
        assert!(recorder.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_count_is_rejected() {
        let client = ScriptedClient::new(vec![]);
        let err = run_analysis_with_client(&client, &request("sarees", 9), &Recorder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn discovery_failure_aborts_without_checks() {
        let client = ScriptedClient::new(vec![Err("invalid api key")]);
        let err = run_analysis_with_client(&client, &request("sarees, kaftans", 2), &Recorder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Discovery(_)));
        assert!(!err.is_configuration_error());
        assert!(err.to_string().contains("invalid api key"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn zero_discovered_queries_yield_empty_table() {
        let client = ScriptedClient::new(vec![]);
        let recorder = Recorder::default();
        let table = run_analysis_with_client(&client, &request(" , ", 3), &recorder)
            .await
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(
            recorder.0.lock().unwrap().last(),
            Some(&AnalysisProgressEvent::Complete {
                rows: 0,
                share_of_voice: None
            })
        );
    }
}
