//! MCP stdio transport to the vector subprocess (`rmcp` client side).

use async_trait::async_trait;
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::VectorConfig;
use crate::error::VectorError;
use crate::vector::{message_signals_disconnect, Connector, ToolArgs, ToolSession};

/// Spawns the configured command and runs the MCP initialize handshake.
pub struct McpConnector {
    command: String,
    args: Vec<String>,
}

impl McpConnector {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &VectorConfig) -> Self {
        Self::new(config.command.clone(), config.command_args())
    }
}

#[async_trait]
impl Connector for McpConnector {
    async fn connect(&self) -> Result<Arc<dyn ToolSession>, VectorError> {
        let mut command = tokio::process::Command::new(&self.command);
        command.args(&self.args).kill_on_drop(true);

        tracing::info!(command = %self.command, args = ?self.args, "spawning vector subprocess");
        let transport = TokioChildProcess::new(command).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VectorError::Unavailable(format!("`{}` not found: {e}", self.command))
            } else {
                VectorError::Connection(format!("failed to spawn `{}`: {e}", self.command))
            }
        })?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| VectorError::Connection(format!("handshake failed: {e}")))?;

        Ok(Arc::new(McpSession {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
        }))
    }
}

/// A running MCP client session.
pub struct McpSession {
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
}

#[async_trait]
impl ToolSession for McpSession {
    async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<String, VectorError> {
        // Built from the wire shape; the request type is inferred from call_tool
        let request = serde_json::from_value(json!({ "name": name, "arguments": args }))
            .map_err(|e| VectorError::Tool {
                tool: name.to_string(),
                message: format!("invalid tool request: {e}"),
            })?;

        let result = self.peer.call_tool(request).await.map_err(|e| {
            let message = e.to_string();
            if message_signals_disconnect(&message) {
                VectorError::Disconnected(message)
            } else {
                VectorError::Tool {
                    tool: name.to_string(),
                    message,
                }
            }
        })?;

        // Read the result through its wire shape rather than the model types
        let value = serde_json::to_value(&result).map_err(|e| VectorError::ProtocolParse {
            message: e.to_string(),
            raw: format!("{result:?}"),
        })?;
        let text = value
            .get("content")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if value.get("isError").and_then(Value::as_bool) == Some(true) {
            return Err(VectorError::Tool {
                tool: name.to_string(),
                message: text,
            });
        }
        Ok(text)
    }

    async fn close(&self) -> Result<(), VectorError> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };
        // The child was spawned with kill_on_drop, so a failed cancel still
        // terminates it when the service is dropped.
        service
            .cancel()
            .await
            .map(|reason| tracing::debug!(?reason, "vector session cancelled"))
            .map_err(|e| VectorError::Connection(format!("close failed: {e}")))
    }
}
