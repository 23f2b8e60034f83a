use crate::rendezvous::RendezvousChannel;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use duet_core::{ClientEvent, PeerId, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Rendezvous channel over the authority's `/ws/{peer_id}` WebSocket.
#[derive(Clone)]
pub struct WsRendezvousChannel {
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl WsRendezvousChannel {
    /// Connects to `base_url` (e.g. `ws://localhost:3000`) and returns the
    /// channel plus the stream of decoded server events.
    pub async fn connect(
        base_url: &str,
        peer_id: &PeerId,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>)> {
        let url = format!("{}/ws/{}", base_url.trim_end_matches('/'), peer_id);
        let (socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {url}"))?;
        info!("Connected to rendezvous at {}", url);

        let (mut sender, mut receiver) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (inbound_tx, inbound_rx) = mpsc::channel(256);

        tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize client event: {}", e),
                }
            }
            let _ = sender.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if inbound_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid server event: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Rendezvous socket error: {}", e);
                        break;
                    }
                }
            }
            debug!("Rendezvous socket closed");
        });

        Ok((Self { outbound }, inbound_rx))
    }
}

#[async_trait]
impl RendezvousChannel for WsRendezvousChannel {
    async fn emit(&self, event: ClientEvent) -> Result<()> {
        self.outbound
            .send(event)
            .map_err(|_| anyhow!("rendezvous socket is closed"))
    }
}
