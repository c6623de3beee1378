//! Server entry points: MCP over stdio, and an HTTP listener carrying both the
//! JSON API (`/api/*`) and MCP over Streamable HTTP (`/mcp`).
//!
//! Both build one [`OracleContext`] and close its vector subprocess on the
//! way out.

use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rmcp::ServiceExt;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::OracleConfig;
use crate::context::OracleContext;
use crate::error::{SearchError, VectorError};
use crate::search::SearchRequest;
use crate::tools::OracleTools;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: OracleConfig) -> Result<()> {
    tracing::info!("starting Oracle MCP server on stdio");
    let context = Arc::new(OracleContext::open(&config)?);

    let tools = OracleTools::new(Arc::clone(&context));
    let server = tools.serve(rmcp::transport::stdio()).await?;
    tracing::info!("MCP server running, waiting for client");

    let outcome = server.waiting().await;
    context.close().await;
    tracing::info!("MCP server shut down");
    outcome?;
    Ok(())
}

/// Start the HTTP server. Serves until ctrl-c.
pub async fn serve_http(config: OracleConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let context = Arc::new(OracleContext::open(&config)?);

    let mcp_context = Arc::clone(&context);
    let mcp = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(OracleTools::new(Arc::clone(&mcp_context))),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = api_router(Arc::clone(&context)).nest_service("/mcp", mcp);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "HTTP server listening at http://{bind_addr}");

    let outcome = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await;

    context.close().await;
    outcome?;
    Ok(())
}

/// The `/api/*` routes over a shared context.
pub fn api_router(context: Arc<OracleContext>) -> Router {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/similar", get(similar))
        .route("/api/stats", get(stats))
        .route("/api/health", get(health))
        .with_state(context)
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(rename = "type")]
    doc_type: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimilarQuery {
    id: String,
    limit: Option<usize>,
}

/// Error body for the JSON API.
struct ApiError(StatusCode, String);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        let status = match &err {
            SearchError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            SearchError::Vector(VectorError::NotFound(_)) => StatusCode::NOT_FOUND,
            SearchError::Vector(e) if e.is_connection_error() => StatusCode::SERVICE_UNAVAILABLE,
            SearchError::LexicalTimeout(_) | SearchError::Vector(VectorError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_server_error() {
            tracing::error!(status = %self.0, error = %self.1, "api request failed");
        }
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

async fn search(
    State(context): State<Arc<OracleContext>>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let request = SearchRequest::from_args(
        params.q,
        params.doc_type.as_deref(),
        params.limit,
        params.offset,
        params.mode.as_deref(),
        context.engine().config().default_limit,
    )?;
    let response = context.engine().search(request).await?;
    Ok(Json(response).into_response())
}

async fn similar(
    State(context): State<Arc<OracleContext>>,
    Query(params): Query<SimilarQuery>,
) -> Result<Response, ApiError> {
    let limit = params.limit.unwrap_or(5);
    let results = context.engine().similar(&params.id, limit).await?;
    Ok(Json(serde_json::json!({ "id": params.id, "results": results })).into_response())
}

async fn stats(State(context): State<Arc<OracleContext>>) -> Result<Response, ApiError> {
    Ok(Json(context.stats().await?).into_response())
}

async fn health(State(context): State<Arc<OracleContext>>) -> Result<Response, ApiError> {
    let report = context.health().await?;
    let status = if report.status == "error" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    Ok((status, Json(report)).into_response())
}
