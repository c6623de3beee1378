//! External vector-search subprocess.
//!
//! The semantic index lives in a separate process that speaks a tool-call
//! protocol over stdio. [`client::VectorClient`] owns that process and its
//! connection state; [`collection::Collection`] wraps the individual tool
//! verbs; [`parser`] recovers structured data from the process's loosely
//! formatted text responses. The transport itself sits behind the
//! [`Connector`] and [`ToolSession`] traits so the MCP implementation in
//! [`mcp`] can be swapped for a scripted one in tests.

pub mod client;
pub mod collection;
pub mod mcp;
pub mod parser;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::VectorError;

pub use client::{ConnectionState, VectorClient};
pub use collection::Collection;

/// Tool arguments as a JSON object.
pub type ToolArgs = Map<String, Value>;

/// A live, handshaken connection to the subprocess.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Invoke a named tool and return its text output.
    ///
    /// Lost connections must be reported as [`VectorError::Disconnected`] or
    /// carry a message [`is_disconnect`] recognises.
    async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<String, VectorError>;

    /// Graceful shutdown. Implementations force-terminate if that fails.
    async fn close(&self) -> Result<(), VectorError>;
}

/// Spawns the subprocess and performs the handshake.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Return [`VectorError::Unavailable`] when retrying can never succeed
    /// (for example the executable does not exist).
    async fn connect(&self) -> Result<Arc<dyn ToolSession>, VectorError>;
}

/// Messages transports use to say the peer is gone.
const DISCONNECT_MARKERS: &[&str] = &[
    "not connected",
    "transport closed",
    "connection closed",
    "broken pipe",
    "channel closed",
];

/// Whether a transport message reports a lost connection.
pub fn message_signals_disconnect(message: &str) -> bool {
    let message = message.to_lowercase();
    DISCONNECT_MARKERS.iter().any(|m| message.contains(m))
}

/// Whether an error means the subprocess connection was lost.
pub fn is_disconnect(err: &VectorError) -> bool {
    match err {
        VectorError::Disconnected(_) => true,
        VectorError::Tool { message, .. } => message_signals_disconnect(message),
        _ => false,
    }
}
