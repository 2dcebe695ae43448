//! HTTP endpoint
//!
//! `POST /api/tickets/draft` runs one clarification round per request; the
//! caller carries the dialogue state in `previousClarifications`.
//! `GET /health` answers liveness probes.

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use eyre::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::{ErrorCode, TicketRequest};
use crate::llm::ClientCache;
use crate::pipeline::{PipelineError, PipelineSettings, TicketPipeline};
use crate::prompts::PromptLoader;

/// Header that overrides the configured upstream credential
pub const API_KEY_HEADER: &str = "x-llm-api-key";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub prompts: Arc<PromptLoader>,
    pub clients: Arc<ClientCache>,
    pub settings: PipelineSettings,
}

impl AppState {
    pub fn new(config: Config, clients: ClientCache) -> Self {
        debug!("AppState::new: called");
        let prompts = PromptLoader::new(config.pipeline.prompts_dir.as_deref());
        let settings = PipelineSettings::from_config(&config);
        Self {
            config: Arc::new(config),
            prompts: Arc::new(prompts),
            clients: Arc::new(clients),
            settings,
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tickets/draft", post(draft_ticket))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let bind = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .context(format!("Failed to bind {}", bind))?;
    info!("Listening on {}", bind);

    let app = router(AppState::new(config, ClientCache::new()));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run one clarification round
pub async fn draft_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<TicketRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            return error_response(&PipelineError::InvalidInput(rejection.body_text()));
        }
    };
    debug!(rounds = request.round_count(), "draft_ticket: called");

    if let Err(reason) = request.validate() {
        return error_response(&PipelineError::InvalidInput(reason));
    }

    let Some(api_key) = header_api_key(&headers).or_else(|| state.config.llm.get_api_key()) else {
        return error_response(&PipelineError::InvalidInput(format!(
            "No API key: send the {} header or set {}",
            API_KEY_HEADER, state.config.llm.api_key_env
        )));
    };

    let client = match state.clients.client_for(&state.config.llm, &api_key) {
        Ok(client) => client,
        Err(e) => return error_response(&PipelineError::Upstream(e)),
    };

    let pipeline = TicketPipeline::new(client, Arc::clone(&state.prompts), state.settings.clone());
    match pipeline.run(&request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(&e),
    }
}

fn header_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// HTTP status for a pipeline failure
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::PromptError | ErrorCode::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::MaxRoundsReached => StatusCode::OK,
        ErrorCode::UpstreamError
        | ErrorCode::EmptyResponse
        | ErrorCode::Refused
        | ErrorCode::InvalidJson
        | ErrorCode::SchemaViolation
        | ErrorCode::UnrecognizedIssueType => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &PipelineError) -> Response {
    let code = err.code();
    let status = status_for(code);
    if status.is_server_error() {
        error!(?code, "Draft failed: {}", err);
    } else {
        debug!(?code, "error_response: {}", err);
    }

    let mut response = (status, Json(err.to_response())).into_response();

    if let PipelineError::Upstream(upstream) = err
        && let Some(retry_after) = upstream.retry_after()
        && let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string())
    {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}
