use duet_core::{
    ClientEvent, IceCandidate, PeerConnectionState, PeerId, Role, RoomId, SignalPayload,
};
use duet_peer::{CoordinatorReport, CoordinatorState, SdpKind};

use crate::integration::{TestPeer, init_tracing};
use crate::utils::{
    ScriptedCaptureDevice, TransportOp, drain, relayed, room_assigned, signaling_messages,
};

async fn relay(from: &mut TestPeer, to: &mut TestPeer) -> Vec<ClientEvent> {
    let events = drain(&mut from.outbound);
    for event in relayed(&events) {
        to.server(event).await;
    }
    events
}

#[tokio::test]
async fn test_two_participants_reach_active() {
    init_tracing();

    let alice_id = PeerId::new();
    let bob_id = PeerId::new();
    let mut alice = TestPeer::new(ScriptedCaptureDevice::granting());
    let mut bob = TestPeer::new(ScriptedCaptureDevice::granting());

    alice.start().await;
    bob.start().await;
    assert_eq!(alice.coordinator.state(), &CoordinatorState::Searching);
    assert!(matches!(
        drain(&mut alice.outbound).as_slice(),
        [ClientEvent::FindPartner { .. }]
    ));
    drain(&mut bob.outbound);

    alice
        .server(room_assigned("r1", Role::Initiator, &bob_id))
        .await;
    bob.server(room_assigned("r1", Role::Responder, &alice_id))
        .await;
    assert!(matches!(
        alice.coordinator.state(),
        CoordinatorState::Negotiating {
            role: Role::Initiator,
            ..
        }
    ));

    // Offer goes one way, answer the other.
    let offer = relay(&mut alice, &mut bob).await;
    let offer = signaling_messages(&offer);
    assert_eq!(offer.len(), 1);
    assert_eq!(offer[0].room_id, RoomId::from("r1"));
    assert!(matches!(offer[0].payload, SignalPayload::Offer { .. }));

    let answer = relay(&mut bob, &mut alice).await;
    let answer = signaling_messages(&answer);
    assert!(matches!(answer[0].payload, SignalPayload::Answer { .. }));

    let alice_spy = alice.factory.last_spy().await;
    let bob_spy = bob.factory.last_spy().await;
    assert!(
        alice_spy
            .ops()
            .await
            .iter()
            .any(|op| matches!(op, TransportOp::SetRemote(SdpKind::Answer, _)))
    );

    // Trickled candidates carry the room and land on the partner.
    alice_spy.emit_candidate("alice-host").await;
    bob_spy.emit_candidate("bob-host").await;
    alice.coordinator.settle().await;
    bob.coordinator.settle().await;

    let from_alice = relay(&mut alice, &mut bob).await;
    relay(&mut bob, &mut alice).await;
    let candidate = &signaling_messages(&from_alice)[0];
    assert_eq!(candidate.room_id, RoomId::from("r1"));
    assert_eq!(
        candidate.payload,
        SignalPayload::IceCandidate(IceCandidate::new("alice-host"))
    );
    assert_eq!(bob_spy.applied_candidates().await, vec!["alice-host"]);
    assert_eq!(alice_spy.applied_candidates().await, vec!["bob-host"]);

    alice_spy.emit_state(PeerConnectionState::Connected).await;
    bob_spy.emit_state(PeerConnectionState::Connected).await;
    alice.coordinator.settle().await;
    bob.coordinator.settle().await;

    assert_eq!(
        alice.coordinator.state(),
        &CoordinatorState::Active {
            room_id: RoomId::from("r1"),
            partner_id: bob_id.clone(),
        }
    );
    assert_eq!(
        bob.coordinator.state(),
        &CoordinatorState::Active {
            room_id: RoomId::from("r1"),
            partner_id: alice_id,
        }
    );

    let reports = alice.take_reports();
    assert!(
        reports
            .iter()
            .any(|r| matches!(r, CoordinatorReport::PartnerFound(a) if a.partner_id == bob_id))
    );
    assert_eq!(alice.device.prompts(), 1);
}

#[tokio::test]
async fn test_ice_config_from_rendezvous_is_used() {
    init_tracing();

    let mut peer = TestPeer::new(ScriptedCaptureDevice::granting());
    let servers = vec![duet_core::IceServerConfig {
        urls: vec!["turn:turn.example.org:3478".to_string()],
        username: Some("u".to_string()),
        credential: Some("p".to_string()),
    }];

    peer.server(duet_core::ServerEvent::IceConfig {
        ice_servers: servers.clone(),
    })
    .await;
    peer.start().await;
    peer.server(room_assigned("r1", Role::Responder, &PeerId::new()))
        .await;

    assert_eq!(peer.factory.last_spy().await.ice_servers(), servers.as_slice());
}
