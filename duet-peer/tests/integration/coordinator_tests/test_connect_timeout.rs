use duet_core::{
    ClientEvent, ConnectionError, MatchCriteria, PeerConnectionState, PeerId, Role, RoomId,
    ServerEvent, SignalingMessage,
};
use duet_peer::{CoordinatorCommand, CoordinatorReport, PeerConfig};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::integration::{TestPeer, init_tracing};
use crate::utils::{
    ScriptedCaptureDevice, next_client_event, room_assigned, wait_for_report, wait_for_state,
};

#[tokio::test(start_paused = true)]
async fn test_negotiation_times_out() {
    init_tracing();

    let TestPeer {
        coordinator,
        mut reports,
        mut outbound,
        ..
    } = TestPeer::new(ScriptedCaptureDevice::granting());
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let task = tokio::spawn(coordinator.run(inbound_rx, cmd_rx));

    cmd_tx
        .send(CoordinatorCommand::start(MatchCriteria::default()))
        .await
        .expect("Failed to send start");
    assert!(matches!(
        next_client_event(&mut outbound, 1000).await,
        ClientEvent::FindPartner { .. }
    ));

    inbound_tx
        .send(room_assigned("r1", Role::Responder, &PeerId::new()))
        .await
        .expect("Failed to send assignment");
    wait_for_report(&mut reports, 1000, |r| {
        matches!(r, CoordinatorReport::PartnerFound(_))
    })
    .await;

    // The offer never comes.
    let assigned_at = Instant::now();
    let lost = wait_for_report(&mut reports, 60_000, |r| {
        matches!(r, CoordinatorReport::ConnectionLost { .. })
    })
    .await;
    assert_eq!(
        lost,
        CoordinatorReport::ConnectionLost {
            room_id: RoomId::from("r1"),
            error: ConnectionError::Timeout,
        }
    );
    assert!(assigned_at.elapsed() >= Duration::from_secs(20));

    assert_eq!(
        next_client_event(&mut outbound, 1000).await,
        ClientEvent::LeaveRoom {
            room_id: RoomId::from("r1")
        }
    );
    assert!(matches!(
        next_client_event(&mut outbound, 1000).await,
        ClientEvent::FindPartner { .. }
    ));

    drop(cmd_tx);
    task.await.expect("Coordinator panicked");
}

#[tokio::test(start_paused = true)]
async fn test_lost_connectivity_while_active_rearms_timeout() {
    init_tracing();

    let config = PeerConfig {
        connect_timeout_secs: 5,
        ..PeerConfig::default()
    };
    let TestPeer {
        coordinator,
        mut reports,
        mut outbound,
        factory,
        ..
    } = TestPeer::with_config(ScriptedCaptureDevice::granting(), config);
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let task = tokio::spawn(coordinator.run(inbound_rx, cmd_rx));

    cmd_tx
        .send(CoordinatorCommand::start(MatchCriteria::default()))
        .await
        .expect("Failed to send start");
    next_client_event(&mut outbound, 1000).await;

    inbound_tx
        .send(room_assigned("r1", Role::Responder, &PeerId::new()))
        .await
        .expect("Failed to send assignment");
    inbound_tx
        .send(ServerEvent::SignalingMessage(SignalingMessage::offer(
            RoomId::from("r1"),
            "v=0 offer",
        )))
        .await
        .expect("Failed to send offer");
    assert!(matches!(
        next_client_event(&mut outbound, 1000).await,
        ClientEvent::SignalingMessage(_)
    ));

    let spy = factory.last_spy().await;
    spy.emit_state(PeerConnectionState::Connected).await;
    wait_for_state(&mut reports, 1000, |s| {
        matches!(s, duet_peer::CoordinatorState::Active { .. })
    })
    .await;

    // Active has no deadline.
    tokio::time::sleep(Duration::from_secs(30)).await;
    while let Ok(report) = reports.try_recv() {
        assert!(!matches!(report, CoordinatorReport::ConnectionLost { .. }));
    }

    spy.emit_state(PeerConnectionState::Disconnected).await;
    let dropped_at = Instant::now();
    let lost = wait_for_report(&mut reports, 60_000, |r| {
        matches!(r, CoordinatorReport::ConnectionLost { .. })
    })
    .await;
    assert!(matches!(
        lost,
        CoordinatorReport::ConnectionLost {
            error: ConnectionError::Timeout,
            ..
        }
    ));
    assert!(dropped_at.elapsed() >= Duration::from_secs(5));

    drop(cmd_tx);
    task.await.expect("Coordinator panicked");
}
