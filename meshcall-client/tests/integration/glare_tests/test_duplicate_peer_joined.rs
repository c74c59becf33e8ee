use meshcall_client::{NegotiationState, Role};

use crate::integration::{TestMesh, init_tracing};
use crate::utils::{TransportCall, offer, settle};

#[tokio::test]
async fn test_duplicate_peer_joined_is_ignored() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.mesh.on_peer_joined("B").await.unwrap();
    test.mesh.on_peer_joined("B").await.unwrap();

    assert!(
        test.wait_for_state("B", NegotiationState::OfferPending, 2000)
            .await
    );
    test.mesh.on_peer_joined("B").await.unwrap();
    settle().await;

    assert_eq!(test.mesh.sessions().await.unwrap().len(), 1);
    assert_eq!(test.signaling.offers_to("B"), 1);
    assert_eq!(test.transports.count("B", &TransportCall::Create), 1);
}

#[tokio::test]
async fn test_offer_for_live_responder_is_dropped() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.mesh.on_offer_received("B", offer("first")).await.unwrap();
    assert!(
        test.wait_for_state("B", NegotiationState::AnswerPending, 2000)
            .await
    );

    test.mesh.on_offer_received("B", offer("second")).await.unwrap();
    settle().await;

    let sessions = test.mesh.sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].role, Role::Responder);
    assert_eq!(test.signaling.answers_to("B"), 1);
    assert_eq!(test.transports.count("B", &TransportCall::Create), 1);
}
