use meshcall_client::{MeshEvent, NegotiationState, RemoteTrack};
use meshcall_core::TrackInfo;

use crate::integration::{TestMesh, init_tracing};
use crate::utils::{TransportCall, offer, settle};

#[tokio::test]
async fn test_peer_left_removes_track_exactly_once() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.mesh.on_offer_received("B", offer("B")).await.unwrap();
    assert!(
        test.wait_for_state("B", NegotiationState::AnswerPending, 2000)
            .await
    );
    test.transports
        .emit_track("B", RemoteTrack::detached(TrackInfo::audio("mic")))
        .await;
    test.transports
        .emit_track("B", RemoteTrack::detached(TrackInfo::video("cam")))
        .await;
    assert!(
        test.events
            .wait_for(2000, |e| matches!(e, MeshEvent::RemoteTrackAdded { track, .. } if track.id().0 == "cam"))
            .await
    );

    test.mesh.on_peer_left("B").await.unwrap();
    test.mesh.on_peer_left("B").await.unwrap();

    assert!(
        test.events
            .wait_for(2000, |e| matches!(e, MeshEvent::PeerClosed { .. }))
            .await
    );
    settle().await;

    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::RemoteTrackRemoved { participant } if participant.as_str() == "B")),
        1
    );
    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::PeerClosed { .. })),
        1
    );
    assert!(test.mesh.sessions().await.unwrap().is_empty());
    assert!(
        test.wait_for_calls("B", TransportCall::Close, 1, 2000)
            .await
    );
}

#[tokio::test]
async fn test_peer_left_without_tracks_only_closes() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.connect_as_initiator("B").await;

    test.mesh.on_peer_left("B").await.unwrap();
    assert!(
        test.events
            .wait_for(2000, |e| matches!(e, MeshEvent::PeerClosed { .. }))
            .await
    );

    assert_eq!(
        test.events
            .count(|e| matches!(e, MeshEvent::RemoteTrackRemoved { .. })),
        0
    );
}

#[tokio::test]
async fn test_peer_can_rejoin_after_leaving() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.connect_as_initiator("B").await;
    test.mesh.on_peer_left("B").await.unwrap();
    test.mesh.on_peer_joined("B").await.unwrap();

    assert!(
        test.wait_for_state("B", NegotiationState::OfferPending, 2000)
            .await
    );
    assert!(test.wait_for_sent("B", 2, 2000).await);
    assert_eq!(test.signaling.offers_to("B"), 2);
    assert_eq!(test.transports.count("B", &TransportCall::Create), 2);
}
