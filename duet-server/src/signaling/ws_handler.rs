use crate::lobby::LobbyCommand;
use crate::signaling::SignalingService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use duet_core::{ClientEvent, PeerId, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(peer_id): Path<String>,
    State(service): State<SignalingService>,
) -> Response {
    let peer_id = match peer_id.parse::<PeerId>() {
        Ok(peer_id) => peer_id,
        Err(e) => {
            warn!("Rejecting socket for invalid peer id {:?}: {}", peer_id, e);
            return (StatusCode::BAD_REQUEST, "invalid peer id").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, service))
}

fn into_command(peer_id: &PeerId, event: ClientEvent) -> LobbyCommand {
    let peer_id = peer_id.clone();
    match event {
        ClientEvent::FindPartner { criteria } => LobbyCommand::FindPartner { peer_id, criteria },
        ClientEvent::CancelSearch => LobbyCommand::CancelSearch { peer_id },
        ClientEvent::LeaveRoom { room_id } => LobbyCommand::LeaveRoom { peer_id, room_id },
        ClientEvent::SignalingMessage(message) => LobbyCommand::Relay { peer_id, message },
    }
}

async fn handle_socket(socket: WebSocket, peer_id: PeerId, service: SignalingService) {
    info!("New WebSocket connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (connection, replaced) = service.add_peer(peer_id.clone(), tx);
    if replaced {
        // Whatever the old socket was doing is over.
        let _ = service
            .lobby_tx
            .send(LobbyCommand::Disconnect {
                peer_id: peer_id.clone(),
            })
            .await;
    }

    service.deliver(
        &peer_id,
        &ServerEvent::Welcome {
            peer_id: peer_id.clone(),
        },
    );
    service.deliver(
        &peer_id,
        &ServerEvent::IceConfig {
            ice_servers: service.ice_servers(),
        },
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientEvent>(text.as_str()) {
                            Ok(event) => {
                                if let Err(e) =
                                    service.lobby_tx.send(into_command(&peer_id, event)).await
                                {
                                    error!("Lobby died: {}", e);
                                    break;
                                }
                            }
                            Err(e) => warn!("Invalid ClientEvent from {}: {}", peer_id, e),
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    if service.remove_peer(&peer_id, connection) {
        let _ = service
            .lobby_tx
            .send(LobbyCommand::Disconnect {
                peer_id: peer_id.clone(),
            })
            .await;
    }
    info!("WebSocket disconnected: {}", peer_id);
}
