//! MCP `oracle_search` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `oracle_search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct OracleSearchParams {
    #[schemars(description = "Natural language or keyword query")]
    pub query: String,

    #[schemars(
        description = "Filter by document type: 'principle', 'pattern', 'learning', 'retro', or 'all'. Defaults to 'all'."
    )]
    pub r#type: Option<String>,

    #[schemars(description = "Maximum number of results to return. Defaults to 10.")]
    pub limit: Option<usize>,

    #[schemars(description = "Number of results to skip, for paging. Defaults to 0.")]
    pub offset: Option<usize>,

    #[schemars(
        description = "Search mode: 'hybrid' (keyword + semantic), 'fts' (keyword only), or 'vector' (semantic only). Defaults to 'hybrid'."
    )]
    pub mode: Option<String>,
}
