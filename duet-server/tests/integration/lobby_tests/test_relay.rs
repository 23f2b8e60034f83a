use duet_core::{IceCandidate, MatchCriteria, PeerId, RoomId, ServerEvent, SignalingMessage};
use duet_server::LobbyCommand;

use crate::integration::{create_test_lobby, init_tracing, next_pairing, next_sent, settle};

#[tokio::test]
async fn test_messages_reach_partner_only_for_current_room() {
    init_tracing();

    let (cmd_tx, mut sent_rx, signaling) = create_test_lobby();
    let alice = PeerId::new();
    let bob = PeerId::new();
    for peer_id in [&alice, &bob] {
        cmd_tx
            .send(LobbyCommand::FindPartner {
                peer_id: peer_id.clone(),
                criteria: MatchCriteria::default(),
            })
            .await
            .expect("Failed to send");
    }
    let room_id = next_pairing(&mut sent_rx).await[0].1.room_id.clone();

    let offer = SignalingMessage::offer(room_id.clone(), "v=0 offer");
    cmd_tx
        .send(LobbyCommand::Relay {
            peer_id: alice.clone(),
            message: offer.clone(),
        })
        .await
        .expect("Failed to send");

    let relayed = next_sent(&mut sent_rx).await;
    assert_eq!(relayed.peer_id, bob);
    assert_eq!(relayed.event, ServerEvent::SignalingMessage(offer));

    // Wrong room id: dropped.
    cmd_tx
        .send(LobbyCommand::Relay {
            peer_id: bob.clone(),
            message: SignalingMessage::candidate(
                RoomId::from("some-old-room"),
                IceCandidate::new("candidate:1"),
            ),
        })
        .await
        .expect("Failed to send");
    settle(&cmd_tx).await;
    assert!(sent_rx.try_recv().is_err());
    assert_eq!(signaling.sent_to(&alice).await.len(), 1);
}

#[tokio::test]
async fn test_message_from_peer_without_room_is_dropped() {
    init_tracing();

    let (cmd_tx, mut sent_rx, _signaling) = create_test_lobby();
    cmd_tx
        .send(LobbyCommand::Relay {
            peer_id: PeerId::new(),
            message: SignalingMessage::answer(RoomId::new(), "v=0 answer"),
        })
        .await
        .expect("Failed to send");

    settle(&cmd_tx).await;
    assert!(sent_rx.try_recv().is_err());
}
