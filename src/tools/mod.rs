pub mod oracle_search;
pub mod oracle_similar;
pub mod oracle_stats;

use oracle_search::OracleSearchParams;
use oracle_similar::OracleSimilarParams;
use oracle_stats::OracleStatsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use crate::context::OracleContext;
use crate::search::SearchRequest;

const DEFAULT_SIMILAR_LIMIT: usize = 5;

/// The MCP tool handler. Every tool is a thin adapter over the shared
/// [`OracleContext`].
#[derive(Clone)]
pub struct OracleTools {
    tool_router: ToolRouter<Self>,
    context: Arc<OracleContext>,
}

#[tool_router]
impl OracleTools {
    pub fn new(context: Arc<OracleContext>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            context,
        }
    }

    #[tool(description = "Search the knowledge base. Combines keyword (FTS) and semantic (vector) matching; falls back to keyword results if semantic search is unavailable.")]
    async fn oracle_search(
        &self,
        Parameters(params): Parameters<OracleSearchParams>,
    ) -> Result<String, String> {
        let request = SearchRequest::from_args(
            params.query,
            params.r#type.as_deref(),
            params.limit,
            params.offset,
            params.mode.as_deref(),
            self.context.engine().config().default_limit,
        )
        .map_err(|e| e.to_string())?;

        let response = self
            .context
            .engine()
            .search(request)
            .await
            .map_err(|e| e.to_string())?;

        serde_json::to_string(&response).map_err(|e| format!("serialization failed: {e}"))
    }

    #[tool(description = "Find documents semantically similar to a given document ID. The document itself is never included.")]
    async fn oracle_similar(
        &self,
        Parameters(params): Parameters<OracleSimilarParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, "oracle_similar called");
        let results = self
            .context
            .engine()
            .similar(&params.id, params.limit.unwrap_or(DEFAULT_SIMILAR_LIMIT))
            .await
            .map_err(|e| e.to_string())?;

        serde_json::to_string(&serde_json::json!({
            "id": params.id,
            "results": results,
        }))
        .map_err(|e| format!("serialization failed: {e}"))
    }

    #[tool(description = "Knowledge base statistics: document counts by type and vector collection status.")]
    async fn oracle_stats(
        &self,
        Parameters(_params): Parameters<OracleStatsParams>,
    ) -> Result<String, String> {
        let stats = self
            .context
            .stats()
            .await
            .map_err(|e| format!("stats failed: {e:#}"))?;
        serde_json::to_string(&stats).map_err(|e| format!("serialization failed: {e}"))
    }
}

#[tool_handler]
impl ServerHandler for OracleTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Oracle is a searchable knowledge base. Use oracle_search to find documents, \
                 oracle_similar to explore neighbours of a result, and oracle_stats for counts."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
