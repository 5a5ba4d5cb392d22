use serde_json::json;
use std::sync::Arc;
use url::Url;

use portal_client::{ClientConfig, Portal, PortalError};

use crate::integration::init_tracing;
use crate::utils::{JoinBehavior, MockTransport, StaticResolver, TEST_ROOM, TEST_SERVER, error_reply};

fn portal(transport: &MockTransport) -> Portal {
    Portal::with_parts(
        ClientConfig::default().with_display_name("scene-bot"),
        Arc::new(StaticResolver::new("hub.example")),
        Arc::new(transport.clone()),
    )
}

#[tokio::test]
async fn test_send_message_runs_full_lifecycle() {
    init_tracing();

    let transport = MockTransport::new();
    let server = Url::parse(TEST_SERVER).unwrap();

    portal(&transport)
        .send_message(
            &server,
            "token-A",
            TEST_ROOM,
            "update_scene",
            json!({"url": "https://x/scene.glb"}),
        )
        .await
        .expect("Failed to send message");

    assert_eq!(
        transport.call_labels(),
        vec![
            "connect",
            "join ret",
            "join hub:ABC123",
            "push hub:ABC123 update_scene",
            "leave hub:ABC123",
            "leave ret",
            "disconnect",
        ]
    );
    let params = transport.join_params("hub:ABC123").unwrap();
    assert_eq!(params["profile"]["displayName"], "scene-bot");
}

#[tokio::test]
async fn test_send_message_closes_connection_on_join_failure() {
    init_tracing();

    let transport = MockTransport::new()
        .with_join("hub:ABC123", JoinBehavior::Error(error_reply("no such hub")));
    let server = Url::parse(TEST_SERVER).unwrap();

    let result = portal(&transport)
        .send_message(&server, "token-A", TEST_ROOM, "update_scene", json!({}))
        .await;

    assert!(matches!(result, Err(PortalError::JoinFailed { .. })));
    assert!(transport.pushes().is_empty());
    assert_eq!(
        transport.call_labels().last().map(String::as_str),
        Some("disconnect")
    );
}

#[tokio::test]
async fn test_send_message_rejects_bad_server_url() {
    init_tracing();

    let result = portal_client::send_message(
        "not a url",
        "token-A",
        TEST_ROOM,
        "update_scene",
        json!({}),
        "scene-bot",
    )
    .await;

    assert!(matches!(result, Err(PortalError::Url(_))));
}
