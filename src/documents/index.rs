//! SQLite-backed [`DocumentIndex`] shared across async callers.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::documents::{store, Document, DocumentType};
use crate::search::lexical::DocumentIndex;

/// Wraps the store connection behind a mutex. Calls block; run them on the
/// blocking pool from async code.
#[derive(Clone)]
pub struct SqliteDocumentIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentIndex {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Lock the connection for direct store operations (import, stats).
    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))
    }
}

impl DocumentIndex for SqliteDocumentIndex {
    fn ranked_search(
        &self,
        query: &str,
        type_filter: Option<DocumentType>,
        limit: usize,
    ) -> Result<Vec<(String, f64)>> {
        let conn = self.lock()?;
        store::ranked_search(&conn, query, type_filter, limit)
    }

    fn fetch_documents(&self, ids: &[&str]) -> Result<HashMap<String, Document>> {
        let conn = self.lock()?;
        store::fetch_documents(&conn, ids)
    }
}
