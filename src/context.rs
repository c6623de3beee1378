//! Process-wide state shared by every surface.
//!
//! [`OracleContext::open`] opens the document store, wires the vector
//! subprocess client (lazily connected on first use) and builds the
//! [`SearchEngine`]. The context is constructed once and handed out by `Arc`.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::OracleConfig;
use crate::db::{self, HealthReport};
use crate::documents::{store, SqliteDocumentIndex};
use crate::search::semantic::SemanticSearcher;
use crate::search::SearchEngine;
use crate::vector::mcp::McpConnector;
use crate::vector::{Collection, ConnectionState, Connector, VectorClient};

pub struct OracleContext {
    index: SqliteDocumentIndex,
    engine: SearchEngine,
    vector: Option<Arc<VectorClient>>,
    collection: Option<Collection>,
}

/// Counts reported by `oracle_stats`, `/api/stats` and `oracle stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_documents: u64,
    pub by_type: BTreeMap<String, u64>,
    pub vector: VectorStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorStats {
    pub enabled: bool,
    pub state: Option<ConnectionState>,
    pub collection: Option<String>,
    pub count: u64,
}

/// Liveness report for `/api/health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: HealthReport,
    pub vector_state: Option<ConnectionState>,
}

impl OracleContext {
    /// Open the configured store and set up the MCP-backed vector client.
    pub fn open(config: &OracleConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;
        tracing::info!(db = %db_path.display(), "document store ready");

        let connector: Option<Arc<dyn Connector>> = if config.vector.enabled {
            Some(Arc::new(McpConnector::from_config(&config.vector)))
        } else {
            tracing::info!("vector search disabled by configuration");
            None
        };
        Ok(Self::from_parts(SqliteDocumentIndex::new(conn), connector, config))
    }

    /// Assemble a context from an already-open store and an optional
    /// transport. `None` runs keyword-only.
    pub fn from_parts(
        index: SqliteDocumentIndex,
        connector: Option<Arc<dyn Connector>>,
        config: &OracleConfig,
    ) -> Self {
        let vector = connector.map(|connector| {
            Arc::new(VectorClient::new(
                connector,
                config.vector.call_timeout(),
                config.vector.close_timeout(),
            ))
        });
        let collection = vector
            .as_ref()
            .map(|client| Collection::new(Arc::clone(client), config.vector.collection.clone()));

        let engine = SearchEngine::new(
            Arc::new(index.clone()),
            collection.clone().map(SemanticSearcher::new),
            config.retrieval.clone(),
        );

        Self {
            index,
            engine,
            vector,
            collection,
        }
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn index(&self) -> &SqliteDocumentIndex {
        &self.index
    }

    pub fn collection(&self) -> Option<&Collection> {
        self.collection.as_ref()
    }

    pub fn vector_state(&self) -> Option<ConnectionState> {
        self.vector.as_ref().map(|client| client.state())
    }

    pub async fn stats(&self) -> Result<StatsReport> {
        let index = self.index.clone();
        let by_type = tokio::task::spawn_blocking(move || {
            let conn = index.lock()?;
            store::count_by_type(&conn)
        })
        .await
        .map_err(|e| anyhow::anyhow!("stats task failed: {e}"))??;

        let count = match self.engine.semantic() {
            Some(semantic) => semantic.collection_count().await,
            None => 0,
        };

        Ok(StatsReport {
            total_documents: by_type.values().sum(),
            by_type: by_type.into_iter().collect(),
            vector: VectorStats {
                enabled: self.vector.is_some(),
                state: self.vector_state(),
                collection: self.collection.as_ref().map(|c| c.name().to_string()),
                count,
            },
        })
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let index = self.index.clone();
        let database = tokio::task::spawn_blocking(move || {
            let conn = index.lock()?;
            db::check_database_health(&conn)
        })
        .await
        .map_err(|e| anyhow::anyhow!("health task failed: {e}"))??;

        let vector_state = self.vector_state();
        let status = match (database.integrity_ok, vector_state) {
            (false, _) => "error",
            (true, Some(ConnectionState::Unavailable)) => "degraded",
            (true, _) => "ok",
        };
        Ok(HealthStatus {
            status,
            database,
            vector_state,
        })
    }

    /// Shut down the vector subprocess, if one was started.
    pub async fn close(&self) {
        if let Some(client) = &self.vector {
            client.close().await;
        }
    }
}
