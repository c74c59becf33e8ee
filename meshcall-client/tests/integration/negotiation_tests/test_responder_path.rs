use meshcall_client::{
    MeshEvent, NegotiationState, RemoteTrack, Role, TransportOp, TransportState,
};
use meshcall_core::{SdpKind, SignalMessage, TrackInfo};

use crate::integration::{TestMesh, init_tracing};
use crate::utils::{TransportCall, candidate, offer, settle};

#[tokio::test]
async fn test_offer_is_answered_and_connects_on_transport() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.mesh.on_offer_received("B", offer("B")).await.unwrap();

    assert!(
        test.wait_for_state("B", NegotiationState::AnswerPending, 2000)
            .await,
        "responder should wait for the transport after answering"
    );
    let sessions = test.mesh.sessions().await.unwrap();
    assert_eq!(sessions[0].role, Role::Responder);
    assert_eq!(test.signaling.answers_to("B"), 1);
    assert_eq!(test.signaling.offers_to("B"), 0);
    assert_eq!(
        test.transports.calls("B"),
        vec![
            TransportCall::Create,
            TransportCall::ApplyRemoteDescription(SdpKind::Offer),
            TransportCall::CreateAnswer,
        ]
    );

    // Sending the answer is not enough on its own.
    settle().await;
    assert_eq!(test.events.len(), 0);

    test.transports
        .emit_state("B", TransportState::Connected)
        .await;

    assert!(
        test.wait_for_state("B", NegotiationState::Connected, 2000)
            .await
    );
    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::PeerConnected { .. })),
        1
    );
}

#[tokio::test]
async fn test_remote_track_is_surfaced_once() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.mesh.on_offer_received("B", offer("B")).await.unwrap();
    assert!(
        test.wait_for_state("B", NegotiationState::AnswerPending, 2000)
            .await
    );

    let cam = RemoteTrack::detached(TrackInfo::video("cam"));
    test.transports.emit_track("B", cam.clone()).await;
    test.transports.emit_track("B", cam).await;

    assert!(
        test.events
            .wait_for(2000, |e| matches!(e, MeshEvent::RemoteTrackAdded { .. }))
            .await
    );
    settle().await;

    assert_eq!(test.state_of("B").await, Some(NegotiationState::Connected));
    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::RemoteTrackAdded { track, .. } if track.id().0 == "cam")),
        1
    );
    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::PeerConnected { .. })),
        1
    );
}

#[tokio::test]
async fn test_local_candidates_follow_the_offer() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.transports.hold(TransportOp::CreateOffer);
    test.mesh.on_peer_joined("B").await.unwrap();

    assert!(
        test.wait_for_calls("B", TransportCall::Create, 1, 2000)
            .await
    );
    test.transports.emit_candidate("B", candidate(1)).await;
    settle().await;
    assert!(test.signaling.sent_to("B").is_empty());

    test.transports.release(TransportOp::CreateOffer);

    assert!(test.wait_for_sent("B", 2, 2000).await);
    let sent = test.signaling.sent_to("B");
    assert!(matches!(sent[0], SignalMessage::Offer { .. }));
    assert!(matches!(sent[1], SignalMessage::Candidate { .. }));
}
