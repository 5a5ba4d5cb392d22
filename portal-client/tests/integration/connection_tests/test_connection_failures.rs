use std::time::Duration;
use url::Url;

use portal_client::{ClientConfig, PortalError, ServerConnection};

use crate::integration::{init_tracing, open_connection};
use crate::utils::{MockTransport, OpenBehavior, StaticResolver, TEST_SERVER};

#[tokio::test]
async fn test_socket_error_fails_construction() {
    init_tracing();

    let transport = MockTransport::new().with_open(OpenBehavior::Error("refused".into()));
    let result = open_connection(&transport).await;

    assert!(
        matches!(result, Err(PortalError::ConnectFailed { ref url }) if url.starts_with(TEST_SERVER)),
        "expected ConnectFailed, got {:?}",
        result.err()
    );
    // The socket is released and nothing else was attempted on it.
    assert_eq!(transport.call_labels(), vec!["connect", "disconnect"]);
}

#[tokio::test(start_paused = true)]
async fn test_close_while_opening_fails_without_waiting() {
    init_tracing();

    let transport = MockTransport::new().with_open(OpenBehavior::CloseDuringOpen);
    let started = tokio::time::Instant::now();
    let result = open_connection(&transport).await;

    assert!(
        matches!(result, Err(PortalError::ConnectFailed { .. })),
        "expected ConnectFailed, got {:?}",
        result.err()
    );
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(transport.call_labels(), vec!["connect", "disconnect"]);
}

#[tokio::test(start_paused = true)]
async fn test_silent_transport_times_out() {
    init_tracing();

    let transport = MockTransport::new().with_open(OpenBehavior::Silent);
    let started = tokio::time::Instant::now();
    let result = open_connection(&transport).await;

    assert!(matches!(result, Err(PortalError::ConnectTimeout { .. })));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(11));
    assert_eq!(transport.call_labels(), vec!["connect", "disconnect"]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_taken_from_config() {
    init_tracing();

    let transport = MockTransport::new().with_open(OpenBehavior::Silent);
    let resolver = StaticResolver::new("hub.example");
    let config = ClientConfig::default().with_timeout(Duration::from_secs(2));
    let started = tokio::time::Instant::now();

    let result = ServerConnection::open(
        Url::parse(TEST_SERVER).unwrap(),
        "token-A",
        config,
        &resolver,
        &transport,
    )
    .await;

    assert!(matches!(result, Err(PortalError::ConnectTimeout { .. })));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_metadata_failure_creates_no_socket() {
    init_tracing();

    let transport = MockTransport::new();
    let resolver = StaticResolver::failing();
    let result = ServerConnection::open(
        Url::parse(TEST_SERVER).unwrap(),
        "token-A",
        ClientConfig::default(),
        &resolver,
        &transport,
    )
    .await;

    assert!(matches!(
        result,
        Err(PortalError::MetadataStatus { status: 500, .. })
    ));
    assert_eq!(resolver.requests(), 1);
    assert!(transport.endpoints().is_empty());
    assert!(transport.calls().is_empty());
}
