mod helpers;

use async_trait::async_trait;
use helpers::{ConnectMode, FakeBackend};
use oracle_kb::error::VectorError;
use oracle_kb::vector::{Connector, ConnectionState, ToolArgs, ToolSession, VectorClient};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn client(backend: &Arc<FakeBackend>) -> VectorClient {
    VectorClient::new(
        backend.connector(),
        Duration::from_secs(5),
        Duration::from_millis(200),
    )
}

#[tokio::test]
async fn connects_lazily_on_first_call() {
    let backend = FakeBackend::constant("42");
    let client = client(&backend);
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(backend.connects(), 0);

    let out = client.call("chroma_get_collection_count", ToolArgs::new()).await.unwrap();
    assert_eq!(out, "42");
    assert_eq!(client.state(), ConnectionState::Connected);

    client.call("chroma_get_collection_count", ToolArgs::new()).await.unwrap();
    assert_eq!(backend.connects(), 1, "connected session is reused");
}

#[tokio::test]
async fn a_single_disconnect_is_retried_on_a_fresh_connection() {
    let backend = FakeBackend::constant("ok");
    backend.inject([VectorError::Disconnected("transport closed".into())]);
    let client = client(&backend);

    let out = client.call("chroma_query_documents", ToolArgs::new()).await.unwrap();
    assert_eq!(out, "ok");
    assert_eq!(backend.connects(), 2);
    assert_eq!(backend.calls(), 2);
    assert_eq!(backend.closes(), 1, "stale session is released before reconnecting");
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn a_second_disconnect_propagates() {
    let backend = FakeBackend::constant("ok");
    backend.inject([
        VectorError::Disconnected("transport closed".into()),
        VectorError::Tool {
            tool: "chroma_query_documents".into(),
            message: "Not connected".into(),
        },
    ]);
    let client = client(&backend);

    let err = client
        .call("chroma_query_documents", ToolArgs::new())
        .await
        .unwrap_err();
    assert!(matches!(err, VectorError::Tool { ref message, .. } if message == "Not connected"));
    assert_eq!(backend.connects(), 2, "exactly one reconnect per call");
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn tool_errors_are_not_retried() {
    let backend = FakeBackend::constant("ok");
    backend.inject([VectorError::Tool {
        tool: "chroma_query_documents".into(),
        message: "collection oracle_knowledge does not exist".into(),
    }]);
    let client = client(&backend);

    let err = client
        .call("chroma_query_documents", ToolArgs::new())
        .await
        .unwrap_err();
    assert!(matches!(err, VectorError::Tool { .. }));
    assert_eq!(backend.connects(), 1);
    assert_eq!(backend.calls(), 1);
    assert_eq!(client.state(), ConnectionState::Connected, "tool errors keep the session");
}

#[tokio::test]
async fn missing_executable_is_terminal() {
    let backend = FakeBackend::constant("ok");
    backend.set_connect_mode(ConnectMode::NotFound);
    let client = client(&backend);

    let err = client.call("chroma_query_documents", ToolArgs::new()).await.unwrap_err();
    assert!(matches!(err, VectorError::Unavailable(_)));
    assert_eq!(client.state(), ConnectionState::Unavailable);

    // Fixing the backend does not help within this session
    backend.set_connect_mode(ConnectMode::Ok);
    let err = client.call("chroma_query_documents", ToolArgs::new()).await.unwrap_err();
    assert!(matches!(err, VectorError::Unavailable(_)));
    assert_eq!(backend.connects(), 1);
}

#[tokio::test]
async fn handshake_failure_can_be_retried_later() {
    let backend = FakeBackend::constant("ok");
    backend.set_connect_mode(ConnectMode::HandshakeFails);
    let client = client(&backend);

    let err = client.call("chroma_query_documents", ToolArgs::new()).await.unwrap_err();
    assert!(matches!(err, VectorError::Connection(_)));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    backend.set_connect_mode(ConnectMode::Ok);
    assert_eq!(client.call("chroma_query_documents", ToolArgs::new()).await.unwrap(), "ok");
    assert_eq!(backend.connects(), 2);
}

#[tokio::test]
async fn slow_calls_time_out() {
    let backend = FakeBackend::constant("ok");
    backend.set_delay(Duration::from_millis(300));
    let client = VectorClient::new(
        backend.connector(),
        Duration::from_millis(50),
        Duration::from_millis(50),
    );

    let err = client.call("chroma_query_documents", ToolArgs::new()).await.unwrap_err();
    assert!(matches!(err, VectorError::Timeout(_)));
}

#[tokio::test]
async fn close_is_idempotent_and_allows_reconnect() {
    let backend = FakeBackend::constant("ok");
    let client = client(&backend);

    client.close().await;
    assert_eq!(backend.closes(), 0, "closing before connecting is a no-op");

    client.call("chroma_query_documents", ToolArgs::new()).await.unwrap();
    client.close().await;
    client.close().await;
    assert_eq!(backend.closes(), 1);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    client.call("chroma_query_documents", ToolArgs::new()).await.unwrap();
    assert_eq!(backend.connects(), 2);
}

#[tokio::test]
async fn concurrent_callers_share_one_connect() {
    let backend = FakeBackend::constant("ok");
    let client = Arc::new(client(&backend));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.call("chroma_query_documents", ToolArgs::new()).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "ok");
    }
    assert_eq!(backend.connects(), 1);
    assert_eq!(backend.calls(), 8);
}

/// Session 1 is dead on arrival. Later sessions answer after a short delay,
/// and fail if they were closed while the call was in flight.
struct NumberedSession {
    number: usize,
    closed: AtomicBool,
}

#[async_trait]
impl ToolSession for NumberedSession {
    async fn call_tool(&self, _name: &str, _args: ToolArgs) -> Result<String, VectorError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if self.number == 1 || self.closed.load(Ordering::SeqCst) {
            return Err(VectorError::Disconnected(format!(
                "session {} transport closed",
                self.number
            )));
        }
        Ok(format!("ok from {}", self.number))
    }

    async fn close(&self) -> Result<(), VectorError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct NumberedConnector {
    connects: AtomicUsize,
}

#[async_trait]
impl Connector for NumberedConnector {
    async fn connect(&self) -> Result<Arc<dyn ToolSession>, VectorError> {
        let number = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(NumberedSession {
            number,
            closed: AtomicBool::new(false),
        }))
    }
}

#[tokio::test]
async fn concurrent_retries_share_the_replacement_session() {
    let connector = Arc::new(NumberedConnector::default());
    let client = VectorClient::new(
        connector.clone(),
        Duration::from_secs(5),
        Duration::from_millis(200),
    );

    let (a, b) = tokio::join!(
        client.call("chroma_query_documents", ToolArgs::new()),
        client.call("chroma_query_documents", ToolArgs::new()),
    );

    assert_eq!(a.unwrap(), "ok from 2");
    assert_eq!(b.unwrap(), "ok from 2");
    assert_eq!(connector.connects.load(Ordering::SeqCst), 2, "one reconnect serves both callers");
    assert_eq!(client.state(), ConnectionState::Connected);
}
