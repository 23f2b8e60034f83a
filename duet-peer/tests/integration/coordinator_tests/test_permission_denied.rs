use duet_core::{ClientEvent, PeerId, PermissionError, Role, RoomId};
use duet_peer::{CoordinatorReport, CoordinatorState, LocalMediaState};

use crate::integration::{TestPeer, init_tracing};
use crate::utils::{ScriptedCaptureDevice, drain, room_assigned};

#[tokio::test]
async fn test_denied_capture_blocks_without_contacting_rendezvous() {
    init_tracing();

    let mut peer = TestPeer::new(ScriptedCaptureDevice::denying());
    peer.start().await;

    assert_eq!(
        peer.coordinator.state(),
        &CoordinatorState::Blocked(PermissionError::Denied)
    );
    assert!(peer.channel.events().await.is_empty());
    assert_eq!(peer.factory.created().await, 0);

    let reports = peer.take_reports();
    assert_eq!(
        reports,
        vec![
            CoordinatorReport::StateChanged(CoordinatorState::AwaitingMedia),
            CoordinatorReport::StateChanged(CoordinatorState::Blocked(PermissionError::Denied)),
            CoordinatorReport::Blocked(PermissionError::Denied),
        ]
    );
    assert!(matches!(
        peer.coordinator.media().state(),
        LocalMediaState::Denied(PermissionError::Denied)
    ));
}

#[tokio::test]
async fn test_blocked_needs_explicit_retry() {
    init_tracing();

    let mut peer = TestPeer::new(ScriptedCaptureDevice::denying());
    peer.start().await;
    assert_eq!(peer.device.prompts(), 1);

    // Nothing but a new Start leaves Blocked; a pairing is refused.
    peer.server(room_assigned("r1", Role::Initiator, &PeerId::new()))
        .await;
    assert!(matches!(
        peer.coordinator.state(),
        CoordinatorState::Blocked(_)
    ));
    assert_eq!(
        drain(&mut peer.outbound),
        vec![ClientEvent::LeaveRoom {
            room_id: RoomId::from("r1")
        }]
    );

    peer.start().await;
    assert_eq!(peer.device.prompts(), 2);
    assert!(matches!(
        peer.coordinator.state(),
        CoordinatorState::Blocked(_)
    ));
}
