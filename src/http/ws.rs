use super::state::AppState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{future, SinkExt, StreamExt};
use tracing::{info, warn};

/// Close code sent when the session has no open connection
const CLOSE_NO_CONNECTION: u16 = 4004;

/// GET /ws/:session_id
/// Attach a websocket client to the session's open relay
pub async fn relay_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| attach_socket(state, session_id, socket))
}

async fn attach_socket(state: AppState, session_id: String, mut socket: WebSocket) {
    if state.service.registry().lookup(&session_id).await.is_none() {
        warn!("Websocket for session {} has no open connection", session_id);
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_NO_CONNECTION,
                reason: "Session not found".into(),
            })))
            .await;
        return;
    }

    let (ws_tx, ws_rx) = socket.split();
    let sink = ws_tx.with(|text: String| future::ready(Ok::<_, axum::Error>(Message::Text(text))));
    let inbound = ws_rx
        .take_while(|msg| future::ready(matches!(msg, Ok(m) if !matches!(m, Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Text(text)) => Some(text),
                _ => None,
            })
        });

    match state.service.attach_client(&session_id, sink, inbound).await {
        Ok(()) => info!("Websocket client attached to session {}", session_id),
        Err(e) => warn!("Could not attach websocket to session {}: {}", session_id, e),
    }
}
