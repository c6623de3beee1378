//! MCP `oracle_similar` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct OracleSimilarParams {
    #[schemars(description = "ID of the document to find neighbours for")]
    pub id: String,

    #[schemars(description = "Maximum number of similar documents. Defaults to 5.")]
    pub limit: Option<usize>,
}
