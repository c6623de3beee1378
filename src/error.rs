//! Error types for the retrieval engine.
//!
//! [`VectorError`] covers everything that can go wrong talking to the vector
//! subprocess. [`SearchError`] is what the orchestrator surfaces to callers;
//! semantic-leg failures normally never reach it because they are downgraded
//! to a warning on the response.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by the vector subprocess client and the semantic adapter.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Spawning the subprocess or completing the handshake failed.
    #[error("vector backend connection failed: {0}")]
    Connection(String),
    /// The transport reported that the subprocess is no longer connected.
    #[error("vector backend not connected: {0}")]
    Disconnected(String),
    /// The subprocess cannot be started at all; no further attempts this session.
    #[error("vector backend unavailable: {0}")]
    Unavailable(String),
    /// The remote tool ran but reported an error.
    #[error("vector tool `{tool}` failed: {message}")]
    Tool { tool: String, message: String },
    /// Response text could not be interpreted even after repair.
    #[error("unparseable response from vector backend: {message}")]
    ProtocolParse { message: String, raw: String },
    /// Nearest-neighbor lookup against a document with no stored embedding.
    #[error("no stored embedding for document {0}")]
    NotFound(String),
    #[error("vector call timed out after {0:?}")]
    Timeout(Duration),
}

impl VectorError {
    /// True for the connection class: failed connects and lost connections.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Disconnected(_) | Self::Unavailable(_)
        )
    }
}

/// Errors surfaced by [`crate::search::SearchEngine`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search parameters: {0}")]
    InvalidParams(String),
    /// The lexical leg failed. There is no fallback for it.
    #[error("lexical search failed: {0:#}")]
    Lexical(anyhow::Error),
    #[error("lexical search timed out after {0:?}")]
    LexicalTimeout(Duration),
    #[error(transparent)]
    Vector(#[from] VectorError),
}
