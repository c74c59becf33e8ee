use meshcall_client::{MeshError, NegotiationState, Role, TransportOp};

use crate::integration::{TestMesh, init_tracing};
use crate::utils::settle;

#[tokio::test]
async fn test_renegotiate_replaces_failed_session() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.transports.fail("B", TransportOp::CreateOffer);
    test.mesh.on_peer_joined("B").await.unwrap();
    assert!(
        test.wait_for_state("B", NegotiationState::Failed, 2000)
            .await
    );

    // Nothing retries on its own.
    settle().await;
    assert_eq!(test.state_of("B").await, Some(NegotiationState::Failed));

    test.transports.clear_failures();
    test.mesh.renegotiate("B").await.unwrap();

    assert!(
        test.wait_for_state("B", NegotiationState::OfferPending, 2000)
            .await
    );
    let sessions = test.mesh.sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].role, Role::Initiator);
    assert_eq!(test.signaling.offers_to("B"), 1);
}

#[tokio::test]
async fn test_renegotiate_leaves_live_session_alone() {
    init_tracing();

    let test = TestMesh::joined("A").await;
    test.connect_as_initiator("B").await;

    test.mesh.renegotiate("B").await.unwrap();
    settle().await;

    assert_eq!(test.state_of("B").await, Some(NegotiationState::Connected));
    assert_eq!(test.signaling.offers_to("B"), 1);
}

#[tokio::test]
async fn test_renegotiate_requires_a_room() {
    init_tracing();

    let test = TestMesh::spawn("A");
    let err = test.mesh.renegotiate("B").await.unwrap_err();
    assert!(matches!(err, MeshError::NotInRoom));
}
