#![allow(dead_code)]

use async_trait::async_trait;
use oracle_kb::config::OracleConfig;
use oracle_kb::context::OracleContext;
use oracle_kb::db;
use oracle_kb::documents::{store, Document, DocumentType, SqliteDocumentIndex};
use oracle_kb::error::VectorError;
use oracle_kb::vector::{Connector, ToolArgs, ToolSession};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How [`FakeBackend`] answers connect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMode {
    Ok,
    /// The executable does not exist.
    NotFound,
    /// Spawn works but the handshake fails.
    HandshakeFails,
}

type Handler = dyn Fn(&str, &ToolArgs) -> Result<String, VectorError> + Send + Sync;

/// Scripted stand-in for the vector subprocess.
///
/// Tool calls first drain `injected` failures, then go to the handler.
/// Counters record connects, tool calls and closes.
pub struct FakeBackend {
    handler: Box<Handler>,
    injected: Mutex<VecDeque<VectorError>>,
    connect_mode: Mutex<ConnectMode>,
    delay: Mutex<Option<Duration>>,
    pub connects: AtomicUsize,
    pub calls: AtomicUsize,
    pub closes: AtomicUsize,
    pub tools_called: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(
        handler: impl Fn(&str, &ToolArgs) -> Result<String, VectorError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            injected: Mutex::new(VecDeque::new()),
            connect_mode: Mutex::new(ConnectMode::Ok),
            delay: Mutex::new(None),
            connects: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            tools_called: Mutex::new(Vec::new()),
        })
    }

    /// A backend that answers every call with `text`.
    pub fn constant(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    /// Queue errors returned by the next tool calls, in order.
    pub fn inject(&self, errors: impl IntoIterator<Item = VectorError>) {
        self.injected.lock().unwrap().extend(errors);
    }

    pub fn set_connect_mode(&self, mode: ConnectMode) {
        *self.connect_mode.lock().unwrap() = mode;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn connector(self: &Arc<Self>) -> Arc<dyn Connector> {
        Arc::new(FakeConnector(Arc::clone(self)))
    }
}

pub struct FakeConnector(Arc<FakeBackend>);

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn ToolSession>, VectorError> {
        self.0.connects.fetch_add(1, Ordering::SeqCst);
        let mode = *self.0.connect_mode.lock().unwrap();
        match mode {
            ConnectMode::Ok => Ok(Arc::new(FakeSession(Arc::clone(&self.0)))),
            ConnectMode::NotFound => Err(VectorError::Unavailable("`fake-vector` not found".into())),
            ConnectMode::HandshakeFails => Err(VectorError::Connection("handshake failed".into())),
        }
    }
}

pub struct FakeSession(Arc<FakeBackend>);

#[async_trait]
impl ToolSession for FakeSession {
    async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<String, VectorError> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        self.0.tools_called.lock().unwrap().push(name.to_string());
        let delay = *self.0.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let injected = self.0.injected.lock().unwrap().pop_front();
        match injected {
            Some(err) => Err(err),
            None => (self.0.handler)(name, &args),
        }
    }

    async fn close(&self) -> Result<(), VectorError> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A document with predictable defaults.
pub fn doc(id: &str, doc_type: DocumentType, content: &str) -> Document {
    Document {
        id: id.to_string(),
        doc_type,
        content: content.to_string(),
        source_file: format!("memory/{id}.md"),
        concepts: vec!["testing".to_string()],
        project: None,
    }
}

/// In-memory store seeded with `docs`.
pub fn seeded_index(docs: &[Document]) -> SqliteDocumentIndex {
    let mut conn = db::open_memory_database().unwrap();
    for d in docs {
        store::upsert_document(&mut conn, d).unwrap();
    }
    SqliteDocumentIndex::new(conn)
}

/// Config with short timeouts suitable for tests.
pub fn test_config() -> OracleConfig {
    let mut config = OracleConfig::default();
    config.vector.call_timeout_ms = 5_000;
    config.vector.close_timeout_ms = 500;
    config.retrieval.leg_timeout_ms = 2_000;
    config
}

/// A context over `docs` with `backend` standing in for the vector process.
pub fn context_with(docs: &[Document], backend: &Arc<FakeBackend>, config: &OracleConfig) -> OracleContext {
    OracleContext::from_parts(seeded_index(docs), Some(backend.connector()), config)
}

/// Render a query response the way the subprocess does: Python literals,
/// single quotes, `None` for missing values.
pub fn query_response(rows: &[(&str, f64)]) -> String {
    let ids: Vec<String> = rows.iter().map(|(id, _)| format!("'{id}'")).collect();
    let distances: Vec<String> = rows.iter().map(|(_, d)| format!("{d}")).collect();
    let documents: Vec<String> = rows
        .iter()
        .map(|(id, _)| format!("'vector copy of {id}'"))
        .collect();
    let metadatas: Vec<String> = rows
        .iter()
        .map(|(id, _)| format!("{{'type': 'learning', 'source_file': 'vec/{id}.md', 'concepts': 'a,b'}}"))
        .collect();
    format!(
        "{{'ids': [[{}]], 'distances': [[{}]], 'documents': [[{}]], 'metadatas': [[{}]], 'embeddings': None}}",
        ids.join(", "),
        distances.join(", "),
        documents.join(", "),
        metadatas.join(", "),
    )
}

/// Render a get-by-id response carrying one embedding (or none).
pub fn get_response(id: &str, embedding: Option<&[f64]>) -> String {
    match embedding {
        Some(values) => {
            let values: Vec<String> = values.iter().map(|v| format!("{v:?}")).collect();
            format!(
                "{{'ids': ['{id}'], 'embeddings': array([[{}]], dtype=float32), 'documents': ['text'], 'metadatas': [None]}}",
                values.join(", ")
            )
        }
        None => "{'ids': [], 'embeddings': array([], dtype=float64), 'documents': [], 'metadatas': []}"
            .to_string(),
    }
}
