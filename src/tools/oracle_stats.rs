use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `oracle_stats` takes no arguments.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct OracleStatsParams {}
