use meshcall_client::{LocalMedia, MeshConfig, MeshError, MeshEvent};
use meshcall_core::RoomId;

use crate::integration::{TestMesh, init_tracing};
use crate::utils::{MockSignalingChannel, settle};

#[tokio::test]
async fn test_join_fails_when_signaling_not_connected() {
    init_tracing();

    let test = TestMesh::spawn_with(
        MockSignalingChannel::disconnected(),
        MeshConfig::default(),
        LocalMedia::new(),
    );

    let err = test.mesh.join_room("r1").await.unwrap_err();
    assert!(matches!(err, MeshError::NotConnected));
    assert!(test.signaling.joined_rooms().is_empty());
}

#[tokio::test]
async fn test_events_before_join_are_ignored() {
    init_tracing();

    let test = TestMesh::spawn("A");
    test.mesh.on_peer_joined("B").await.unwrap();
    settle().await;

    assert!(test.mesh.sessions().await.unwrap().is_empty());
    assert_eq!(test.transports.transports_created(), 0);
}

#[tokio::test]
async fn test_create_room_joins_a_generated_room() {
    init_tracing();

    let test = TestMesh::spawn("A");
    let room = test.mesh.create_room().await.unwrap();

    assert_eq!(room.as_str().len(), 6);
    assert_eq!(test.signaling.joined_rooms(), vec![room]);
}

#[tokio::test]
async fn test_leave_without_room_is_rejected() {
    init_tracing();

    let test = TestMesh::spawn("A");
    let err = test.mesh.leave_room().await.unwrap_err();
    assert!(matches!(err, MeshError::NotInRoom));
}

#[tokio::test]
async fn test_shutdown_leaves_room_and_stops_handle() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.connect_as_initiator("B").await;

    test.mesh.shutdown().await.unwrap();

    assert!(
        test.events
            .wait_for(2000, |e| matches!(e, MeshEvent::PeerClosed { .. }))
            .await
    );
    assert_eq!(test.signaling.left_rooms(), vec![RoomId::from("r1")]);

    let err = test.mesh.sessions().await.unwrap_err();
    assert!(matches!(err, MeshError::Shutdown));
}
