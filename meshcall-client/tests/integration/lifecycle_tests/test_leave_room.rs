use meshcall_client::{MeshEvent, NegotiationState};
use meshcall_core::RoomId;

use crate::integration::{TestMesh, init_tracing};
use crate::utils::{TransportCall, answer, candidate, offer, settle};

#[tokio::test]
async fn test_leave_closes_every_session() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.connect_as_initiator("B").await;
    test.mesh.on_offer_received("C", offer("C")).await.unwrap();
    assert!(
        test.wait_for_state("C", NegotiationState::AnswerPending, 2000)
            .await
    );

    test.mesh.leave_room().await.unwrap();

    assert!(test.mesh.sessions().await.unwrap().is_empty());
    assert_eq!(test.signaling.left_rooms(), vec![RoomId::from("r1")]);
    assert!(
        test.events
            .wait_for(2000, |e| matches!(e, MeshEvent::PeerClosed { participant } if participant.as_str() == "C"))
            .await
    );
    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::PeerClosed { .. })),
        2
    );
    assert!(
        test.wait_for_calls("B", TransportCall::Close, 1, 2000)
            .await
    );
    assert!(
        test.wait_for_calls("C", TransportCall::Close, 1, 2000)
            .await
    );
}

#[tokio::test]
async fn test_inbound_after_leave_recreates_nothing() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.connect_as_initiator("B").await;
    test.mesh.leave_room().await.unwrap();
    settle().await;

    let events_before = test.events.len();
    let transports_before = test.transports.transports_created();
    let sent_before = test.signaling.sent().len();

    test.mesh.on_offer_received("B", offer("late")).await.unwrap();
    test.mesh.on_answer_received("B", answer("late")).await.unwrap();
    test.mesh.on_candidate_received("B", candidate(1)).await.unwrap();
    test.mesh.on_peer_joined("C").await.unwrap();
    test.mesh.on_peer_left("B").await.unwrap();
    settle().await;

    assert!(test.mesh.sessions().await.unwrap().is_empty());
    assert_eq!(test.events.len(), events_before);
    assert_eq!(test.transports.transports_created(), transports_before);
    assert_eq!(test.signaling.sent().len(), sent_before);
}

#[tokio::test]
async fn test_second_leave_is_rejected_without_side_effects() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.connect_as_initiator("B").await;
    test.mesh.leave_room().await.unwrap();
    assert!(test.mesh.leave_room().await.is_err());
    settle().await;

    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::PeerClosed { .. })),
        1
    );
    assert_eq!(test.signaling.left_rooms().len(), 1);
}
