mod config;
mod lobby;
mod signaling;

pub use config::*;
pub use lobby::*;
pub use signaling::*;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};

/// HTTP surface: the signaling socket at `/ws/{peer_id}` and `/health`.
pub fn router(service: SignalingService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/{peer_id}", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(service)
}

/// Serves [`router`] on `listener` until the server fails.
pub async fn serve(listener: TcpListener, service: SignalingService) -> std::io::Result<()> {
    axum::serve(listener, router(service)).await
}

async fn health(State(service): State<SignalingService>) -> Response {
    let (reply, rx) = oneshot::channel();
    if service.lobby().send(LobbyCommand::Stats { reply }).await.is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, "lobby stopped").into_response();
    }

    match rx.await {
        Ok(stats) => Json(json!({
            "status": "ok",
            "connected": service.connected_peers(),
            "waiting": stats.waiting,
            "rooms": stats.rooms,
        }))
        .into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "lobby stopped").into_response(),
    }
}
