use portal_client::{ClientConfig, HttpMetadataResolver, MetadataResolver, PortalError};

use crate::integration::init_tracing;
use crate::utils::FakeMetaServer;

const META: &str = r#"{"version":"1.0.20191126041226","pool":"earth","phx_port":"4000","phx_host":"focused-giant.reticulum.io"}"#;

#[tokio::test]
async fn test_resolver_reads_socket_metadata() {
    init_tracing();

    let server = FakeMetaServer::start(200, META).await.unwrap();
    let resolver = HttpMetadataResolver::new(&ClientConfig::default());

    let metadata = resolver
        .resolve(&server.server_url().unwrap())
        .await
        .expect("Failed to resolve metadata");

    assert_eq!(metadata.socket_host, "focused-giant.reticulum.io");
    assert_eq!(metadata.socket_port.as_deref(), Some("4000"));
    assert_eq!(metadata.pool, "earth");
}

#[tokio::test]
async fn test_resolver_rejects_error_status() {
    init_tracing();

    let server = FakeMetaServer::start(503, "{}").await.unwrap();
    let resolver = HttpMetadataResolver::new(&ClientConfig::default());

    let result = resolver.resolve(&server.server_url().unwrap()).await;

    assert!(matches!(
        result,
        Err(PortalError::MetadataStatus { status: 503, ref url }) if url.ends_with("/api/v1/meta")
    ));
}

#[tokio::test]
async fn test_resolver_rejects_empty_body() {
    init_tracing();

    let server = FakeMetaServer::start(200, "").await.unwrap();
    let resolver = HttpMetadataResolver::new(&ClientConfig::default());

    let result = resolver.resolve(&server.server_url().unwrap()).await;

    assert!(matches!(result, Err(PortalError::EmptyMetadata { .. })));
}

#[tokio::test]
async fn test_resolver_rejects_unparseable_body() {
    init_tracing();

    let server = FakeMetaServer::start(200, r#"{"pool":"earth"}"#).await.unwrap();
    let resolver = HttpMetadataResolver::new(&ClientConfig::default());

    let result = resolver.resolve(&server.server_url().unwrap()).await;

    assert!(matches!(result, Err(PortalError::Json(_))));
}
