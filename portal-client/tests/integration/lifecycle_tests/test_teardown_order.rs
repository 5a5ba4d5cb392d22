use std::time::Duration;

use portal_client::{PortalError, RoomSession};
use portal_core::ConnectionState;

use crate::integration::{init_tracing, open_connection};
use crate::utils::{LeaveBehavior, MockTransport, TEST_ROOM};

#[tokio::test]
async fn test_teardown_runs_in_reverse_order() {
    init_tracing();

    let transport = MockTransport::new();
    let mut connection = open_connection(&transport)
        .await
        .expect("Failed to open connection");
    let mut room = RoomSession::open(TEST_ROOM, &connection, "Alice")
        .await
        .expect("Failed to open room");

    room.close().await.expect("Failed to close room");
    assert_eq!(room.state(), ConnectionState::Closed);
    drop(room);

    connection.close();
    assert_eq!(connection.state(), ConnectionState::Closed);

    assert_eq!(
        transport.call_labels(),
        vec![
            "connect",
            "join ret",
            "join hub:ABC123",
            "leave hub:ABC123",
            "leave ret",
            "disconnect",
        ]
    );
}

#[tokio::test]
async fn test_second_room_close_does_nothing() {
    init_tracing();

    let transport = MockTransport::new();
    let mut connection = open_connection(&transport)
        .await
        .expect("Failed to open connection");
    let mut room = RoomSession::open(TEST_ROOM, &connection, "Alice")
        .await
        .expect("Failed to open room");

    room.close().await.expect("Failed to close room");
    let calls = transport.calls();
    room.close().await.expect("Second close should be a no-op");

    assert_eq!(transport.calls(), calls);
    drop(room);
    connection.close();
}

#[tokio::test]
async fn test_failed_room_leave_still_leaves_control() {
    init_tracing();

    let transport = MockTransport::new().with_leave("hub:ABC123", LeaveBehavior::Fail);
    let mut connection = open_connection(&transport)
        .await
        .expect("Failed to open connection");
    let mut room = RoomSession::open(TEST_ROOM, &connection, "Alice")
        .await
        .expect("Failed to open room");

    let result = room.close().await;

    match result {
        Err(PortalError::Teardown { failures, .. }) => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(failures[0], PortalError::Transport(_)));
        }
        other => panic!("expected Teardown, got {:?}", other),
    }
    assert_eq!(room.state(), ConnectionState::Closed);
    assert!(transport.call_labels().ends_with(&[
        "leave hub:ABC123".to_owned(),
        "leave ret".to_owned()
    ]));

    drop(room);
    connection.close();
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_leave_times_out() {
    init_tracing();

    let transport = MockTransport::new().with_leave("ret", LeaveBehavior::Silent);
    let mut connection = open_connection(&transport)
        .await
        .expect("Failed to open connection");
    let mut room = RoomSession::open(TEST_ROOM, &connection, "Alice")
        .await
        .expect("Failed to open room");
    let started = tokio::time::Instant::now();

    let result = room.close().await;

    match result {
        Err(PortalError::Teardown { failures, .. }) => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(
                failures[0],
                PortalError::LeaveTimeout { ref topic, .. } if topic == "ret"
            ));
        }
        other => panic!("expected Teardown, got {:?}", other),
    }
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(room.state(), ConnectionState::Closed);

    // Handles are gone: closing again touches nothing.
    let calls = transport.calls();
    room.close().await.expect("Second close should be a no-op");
    assert_eq!(transport.calls(), calls);

    drop(room);
    connection.close();
}

#[tokio::test]
async fn test_dropped_room_leaves_channels() {
    init_tracing();

    let transport = MockTransport::new();
    let mut connection = open_connection(&transport)
        .await
        .expect("Failed to open connection");
    let room = RoomSession::open(TEST_ROOM, &connection, "Alice")
        .await
        .expect("Failed to open room");

    drop(room);
    connection.close();

    assert_eq!(
        transport.call_labels(),
        vec![
            "connect",
            "join ret",
            "join hub:ABC123",
            "leave hub:ABC123",
            "leave ret",
            "disconnect",
        ]
    );
}
