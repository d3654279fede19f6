//! Dashboard HTTP server.
//!
//! Serves the single-page dashboard and its downloads. Each analysis runs to
//! completion inside the `POST /analyze` handler; model calls within a run
//! never overlap.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Dashboard page (form + latest results for the session) |
//! | `POST` | `/analyze` | Run an analysis from the submitted form |
//! | `GET`  | `/report.csv` | Download the session's results as CSV |
//! | `GET`  | `/api/results` | The session's results as JSON |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! JSON and CSV endpoints answer errors with:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no results for this session" } }
//! ```
//!
//! The page endpoints always answer with HTML; configuration errors are shown
//! inline with `400`, discovery failures with `502`.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::analysis::{run_analysis, validate_request, AnalysisError};
use crate::config::Config;
use crate::dashboard::{render_page, FormValues, PageView};
use crate::models::{AnalysisRequest, Brand, CategoryMode, ResultRow, ResultsTable};
use crate::progress::AnalysisProgressReporter;
use crate::report::{share_of_voice, to_csv, PresenceDistribution, REPORT_FILE_NAME};
use crate::session::{new_session_id, session_cookie, session_from_cookie_header, ResultsStore};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<ResultsStore>,
    progress: Arc<dyn AnalysisProgressReporter>,
}

impl AppState {
    pub fn new(config: Config, progress: Arc<dyn AnalysisProgressReporter>) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(ResultsStore::new()),
            progress,
        }
    }
}

/// Build the dashboard router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/analyze", post(handle_analyze))
        .route("/report.csv", get(handle_report_csv))
        .route("/api/results", get(handle_results_json))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the dashboard server on `bind` and runs until the process is
/// terminated.
pub async fn run_server(
    config: &Config,
    bind: &str,
    progress: Arc<dyn AnalysisProgressReporter>,
) -> anyhow::Result<()> {
    let app = router(AppState::new(config.clone(), progress));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "dashboard listening");
    println!("AEO dashboard listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Sessions ============

/// The caller's session id, and a `Set-Cookie` value when a new one was issued.
fn session_for(headers: &HeaderMap) -> (String, Option<String>) {
    let existing = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(session_from_cookie_header);

    match existing {
        Some(id) => (id, None),
        None => {
            let id = new_session_id();
            let cookie = session_cookie(&id);
            (id, Some(cookie))
        }
    }
}

fn with_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET / ============

async fn handle_index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session, cookie) = session_for(&headers);
    let table = state.store.get(&session);
    let form = FormValues::from_config(&state.config);

    let html = render_page(&PageView {
        market: &state.config.brand.market,
        form: &form,
        error: None,
        table: table.as_deref(),
    });

    with_cookie(Html(html).into_response(), cookie)
}

// ============ POST /analyze ============

/// Fields of the dashboard form.
#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub brand_domain: String,
    #[serde(default)]
    pub category_mode: String,
    #[serde(default)]
    pub preset_categories: String,
    #[serde(default)]
    pub manual_categories: String,
    #[serde(default)]
    pub queries_per_category: String,
}

impl AnalyzeForm {
    /// Values to show back in the form after submission.
    fn form_values(&self, config: &Config) -> FormValues {
        let defaults = FormValues::from_config(config);
        FormValues {
            brand_name: self.brand_name.trim().to_string(),
            brand_domain: self.brand_domain.trim().to_string(),
            category_mode: CategoryMode::parse(&self.category_mode)
                .unwrap_or(defaults.category_mode),
            preset_categories: self.preset_categories.clone(),
            manual_categories: self.manual_categories.clone(),
            queries_per_category: self
                .queries_per_category
                .trim()
                .parse()
                .unwrap_or(defaults.queries_per_category),
            has_default_key: defaults.has_default_key,
        }
    }

    /// Build the run request. Unparseable counts become 0 so the
    /// orchestrator's range check reports them.
    fn to_request(&self, config: &Config) -> AnalysisRequest {
        let category_mode =
            CategoryMode::parse(&self.category_mode).unwrap_or(CategoryMode::Preset);
        let categories = match category_mode {
            CategoryMode::Preset => self.preset_categories.clone(),
            CategoryMode::Manual => self.manual_categories.clone(),
        };

        let brand_name = self.brand_name.trim().to_string();
        // Configured aliases only apply to the configured brand.
        let aliases = if brand_name.eq_ignore_ascii_case(&config.brand.name) {
            config.brand.aliases.clone()
        } else {
            Vec::new()
        };

        AnalysisRequest {
            api_key: config.resolve_api_key(Some(&self.api_key)),
            brand: Brand {
                name: brand_name,
                domain: self.brand_domain.trim().to_string(),
                aliases,
            },
            market: config.brand.market.clone(),
            category_mode,
            categories,
            queries_per_category: self.queries_per_category.trim().parse().unwrap_or(0),
        }
    }
}

fn analysis_status(error: &AnalysisError) -> StatusCode {
    if error.is_configuration_error() {
        return StatusCode::BAD_REQUEST;
    }
    match error {
        AnalysisError::Discovery(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn handle_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AnalyzeForm>,
) -> Response {
    let (session, cookie) = session_for(&headers);
    let values = form.form_values(&state.config);
    let request = form.to_request(&state.config);

    let render = |status: StatusCode, error: Option<&str>, table: Option<&ResultsTable>| {
        let html = render_page(&PageView {
            market: &state.config.brand.market,
            form: &values,
            error,
            table,
        });
        with_cookie((status, Html(html)).into_response(), cookie.clone())
    };

    // Configuration errors leave the session's previous results in place.
    if let Err(e) = validate_request(&request) {
        tracing::warn!(error = %e, "analysis request rejected");
        let previous = state.store.get(&session);
        return render(StatusCode::BAD_REQUEST, Some(&e.to_string()), previous.as_deref());
    }

    state.store.clear(&session);

    match run_analysis(&state.config.llm, &request, state.progress.as_ref()).await {
        Ok(table) => {
            let table = state.store.publish(&session, table);
            render(StatusCode::OK, None, Some(&*table))
        }
        Err(e) => {
            render(analysis_status(&e), Some(&e.to_string()), None)
        }
    }
}

// ============ GET /report.csv ============

async fn handle_report_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (session, _) = session_for(&headers);
    let table = state
        .store
        .get(&session)
        .ok_or_else(|| not_found("no results for this session"))?;

    let bytes = to_csv(&table).map_err(|e| internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", REPORT_FILE_NAME),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ============ GET /api/results ============

/// JSON response body for `GET /api/results`.
#[derive(Serialize)]
struct ResultsResponse<'a> {
    brand: &'a str,
    generated_at: String,
    share_of_voice: Option<f64>,
    distribution: PresenceDistribution,
    rows: &'a [ResultRow],
}

async fn handle_results_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (session, _) = session_for(&headers);
    let table = state
        .store
        .get(&session)
        .ok_or_else(|| not_found("no results for this session"))?;

    let body = ResultsResponse {
        brand: &table.brand_name,
        generated_at: table.generated_at.to_rfc3339(),
        share_of_voice: share_of_voice(&table),
        distribution: PresenceDistribution::from_table(&table),
        rows: &table.rows,
    };

    Ok(Json(body).into_response())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mode: &str, count: &str) -> AnalyzeForm {
        AnalyzeForm {
            api_key: "sk-form".to_string(),
            brand_name: " House of Masaba ".to_string(),
            brand_domain: "houseofmasaba.com".to_string(),
            category_mode: mode.to_string(),
            preset_categories: "sarees, kaftans".to_string(),
            manual_categories: "floral capes".to_string(),
            queries_per_category: count.to_string(),
        }
    }

    #[test]
    fn mode_selects_category_source() {
        let cfg = Config::minimal();
        assert_eq!(form("preset", "3").to_request(&cfg).categories, "sarees, kaftans");
        assert_eq!(form("manual", "3").to_request(&cfg).categories, "floral capes");
    }

    #[test]
    fn configured_aliases_follow_configured_brand() {
        let cfg = Config::minimal();
        let req = form("preset", "3").to_request(&cfg);
        assert_eq!(req.brand.name, "House of Masaba");
        assert_eq!(req.brand.aliases, vec!["Masaba".to_string()]);

        let mut other = form("preset", "3");
        other.brand_name = "Ritu Kumar".to_string();
        assert!(other.to_request(&cfg).brand.aliases.is_empty());
    }

    #[test]
    fn bad_count_is_rejected_by_validation() {
        let cfg = Config::minimal();
        let req = form("preset", "lots").to_request(&cfg);
        assert_eq!(req.queries_per_category, 0);
        assert!(matches!(
            validate_request(&req),
            Err(AnalysisError::InvalidRequest(_))
        ));
    }

    #[test]
    fn analysis_errors_map_to_status_codes() {
        assert_eq!(
            analysis_status(&AnalysisError::MissingCredential),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            analysis_status(&AnalysisError::InvalidRequest("count".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            analysis_status(&AnalysisError::Discovery(anyhow::anyhow!("401"))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            analysis_status(&AnalysisError::Client(anyhow::anyhow!("tls"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn new_session_sets_cookie_once() {
        let (id, cookie) = session_for(&HeaderMap::new());
        assert!(cookie.is_some());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("aeo_session={}", id)).unwrap(),
        );
        let (same, none) = session_for(&headers);
        assert_eq!(same, id);
        assert!(none.is_none());
    }
}
