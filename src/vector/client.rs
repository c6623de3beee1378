//! Lifecycle of the vector subprocess connection.
//!
//! State machine:
//!
//! ```text
//! Disconnected --connect ok--> Connecting --> Connected
//! Disconnected --connect err-> Connecting --> Disconnected (error raised)
//! Connected ----call lost----> Disconnected --> one reconnect + retry
//! any ----------unrecoverable spawn failure--> Unavailable (terminal)
//! ```
//!
//! All transitions happen inside [`VectorClient`]; adapters only call
//! [`VectorClient::call`].

use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::VectorError;
use crate::vector::{is_disconnect, Connector, ToolArgs, ToolSession};

/// One original attempt plus one retry after reconnecting.
pub const MAX_CALL_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Unavailable,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Unavailable => "unavailable",
        })
    }
}

/// Run `op` up to `max_attempts` times. Between attempts, and only when
/// `is_retryable` accepts the error, `on_retry` runs (typically a reset of
/// the connection). Any other error, or a retryable error on the last
/// attempt, is returned unmodified.
pub async fn with_reconnect<T, E, Op, OpFut, Retry, RetryFut>(
    max_attempts: usize,
    is_retryable: impl Fn(&E) -> bool,
    mut op: Op,
    mut on_retry: Retry,
) -> Result<T, E>
where
    E: std::fmt::Display,
    Op: FnMut() -> OpFut,
    OpFut: Future<Output = Result<T, E>>,
    Retry: FnMut() -> RetryFut,
    RetryFut: Future<Output = ()>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_retryable(&err) => {
                tracing::warn!(attempt, error = %err, "connection lost, reconnecting before retry");
                on_retry().await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Owns the subprocess session. Construct once per process and share by `Arc`.
pub struct VectorClient {
    connector: Arc<dyn Connector>,
    session: Mutex<Option<Arc<dyn ToolSession>>>,
    state: StdMutex<ConnectionState>,
    call_timeout: Duration,
    close_timeout: Duration,
}

impl VectorClient {
    pub fn new(connector: Arc<dyn Connector>, call_timeout: Duration, close_timeout: Duration) -> Self {
        Self {
            connector,
            session: Mutex::new(None),
            state: StdMutex::new(ConnectionState::Disconnected),
            call_timeout,
            close_timeout,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Spawn and handshake if not already connected. Concurrent callers wait
    /// for a single in-flight connect.
    pub async fn connect(&self) -> Result<(), VectorError> {
        let mut session = self.session.lock().await;
        match self.state() {
            ConnectionState::Connected if session.is_some() => return Ok(()),
            ConnectionState::Unavailable => {
                return Err(VectorError::Unavailable(
                    "subprocess could not be started earlier in this session".into(),
                ))
            }
            _ => {}
        }

        self.set_state(ConnectionState::Connecting);
        tracing::info!("connecting to vector subprocess");

        match self.connector.connect().await {
            Ok(new_session) => {
                *session = Some(new_session);
                self.set_state(ConnectionState::Connected);
                tracing::info!("vector subprocess connected");
                Ok(())
            }
            Err(VectorError::Unavailable(reason)) => {
                self.set_state(ConnectionState::Unavailable);
                tracing::error!(reason = %reason, "vector subprocess unavailable for this session");
                Err(VectorError::Unavailable(reason))
            }
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                tracing::warn!(error = %err, "vector subprocess connect failed");
                Err(match err {
                    VectorError::Connection(_) => err,
                    other => VectorError::Connection(other.to_string()),
                })
            }
        }
    }

    /// Invoke a tool, reconnecting and retrying once if the connection was lost.
    pub async fn call(&self, tool: &str, args: ToolArgs) -> Result<String, VectorError> {
        let last_session: StdMutex<Option<Arc<dyn ToolSession>>> = StdMutex::new(None);
        let last_session = &last_session;
        with_reconnect(
            MAX_CALL_ATTEMPTS,
            is_disconnect,
            move || self.call_once(tool, args.clone(), last_session),
            move || {
                let failed = last_session.lock().unwrap_or_else(|e| e.into_inner()).take();
                self.mark_disconnected(failed)
            },
        )
        .await
    }

    /// One attempt. Records the session it used in `used` so a retry can
    /// tell whether that session is still the current one.
    async fn call_once(
        &self,
        tool: &str,
        args: ToolArgs,
        used: &StdMutex<Option<Arc<dyn ToolSession>>>,
    ) -> Result<String, VectorError> {
        self.connect().await?;
        let session = self
            .session
            .lock()
            .await
            .clone()
            .ok_or_else(|| VectorError::Disconnected("session dropped before call".into()))?;
        *used.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&session));

        tracing::debug!(tool, "vector tool call");
        match tokio::time::timeout(self.call_timeout, session.call_tool(tool, args)).await {
            Ok(result) => result,
            Err(_) => Err(VectorError::Timeout(self.call_timeout)),
        }
    }

    /// Drop `failed` after a lost connection, unless another caller has
    /// already replaced it with a fresh session.
    async fn mark_disconnected(&self, failed: Option<Arc<dyn ToolSession>>) {
        let stale = {
            let mut current = self.session.lock().await;
            let is_current = matches!(
                (current.as_ref(), failed.as_ref()),
                (Some(live), Some(dead)) if Arc::ptr_eq(live, dead)
            );
            if !is_current {
                tracing::debug!("session already replaced, retrying on the current one");
                return;
            }
            if self.state() != ConnectionState::Unavailable {
                self.set_state(ConnectionState::Disconnected);
            }
            current.take()
        };
        if let Some(stale) = stale {
            self.shutdown_session(stale).await;
        }
    }

    /// Release the session and the process. Idempotent and never fails.
    pub async fn close(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            self.shutdown_session(session).await;
            tracing::info!("vector subprocess closed");
        }
        if self.state() != ConnectionState::Unavailable {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    async fn shutdown_session(&self, session: Arc<dyn ToolSession>) {
        match tokio::time::timeout(self.close_timeout, session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(error = %err, "error closing vector subprocess"),
            Err(_) => tracing::warn!(
                timeout = ?self.close_timeout,
                "vector subprocess did not close in time, dropping it"
            ),
        }
    }
}
