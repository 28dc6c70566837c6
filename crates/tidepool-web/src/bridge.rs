//! WebSocket bridge — one JSON text frame per chat event.
//!
//! Feeds inbound frames into the coordinator and pumps coordinator events
//! back out. The bridge does no validation beyond JSON parsing; semantic
//! rejection lives in the coordinator.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use tidepool_server::chat::event::{ClientEvent, ServerEvent};
use tidepool_server::chat::switchboard::ConnId;

use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(ws: WebSocket, state: AppState) {
    let conn = ConnId::new();
    let (mut ws_tx, mut ws_rx) = ws.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    state.coordinator.connect(conn, tx);
    info!(%conn, "websocket connected");

    // Coordinator → client pump.
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    debug!("failed to serialize outbound event: {e}");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Client → coordinator pump.
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => state.coordinator.event(conn, event),
                Err(e) => debug!(%conn, "dropped unparseable frame: {e}"),
            },
            Ok(Message::Close(_)) | Err(_) => break,
            // Binary, ping and pong frames carry no chat events.
            Ok(_) => {}
        }
    }

    state.coordinator.disconnect(conn);
    send_task.abort();
    info!(%conn, "websocket closed");
}
