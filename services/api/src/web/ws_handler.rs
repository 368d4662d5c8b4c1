//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! It owns the per-connection conversation state and delegates turns and
//! the end-of-session wrap-up.

use crate::web::{
    chat_turn::run_chat_turn,
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, ChatSessionState},
    wrapup::run_session_wrapup,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New WebSocket connection established for user: {}", user_id);

    let (mut sender, mut receiver) = socket.split();

    // Outgoing frames go through a channel so turn workers never hold the
    // socket; a single forwarder task owns the sink.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let forward_task = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to encode server frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // --- 1. Initialization Phase ---
    let mut state = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(&init_json) {
                Ok(ClientMessage::Init { session_id: Some(id) }) => {
                    match ChatSessionState::resume(&app_state.db, user_id, id).await {
                        Ok(state) => state,
                        Err(e) => {
                            error!("Failed to resume session {}: {}", id, e);
                            let _ = out_tx.send(ServerMessage::Error {
                                message: "Failed to load session data.".to_string(),
                            });
                            drop(out_tx);
                            let _ = forward_task.await;
                            return;
                        }
                    }
                }
                Ok(ClientMessage::Init { session_id: None }) => ChatSessionState::fresh(user_id),
                _ => {
                    error!("First message was not a valid Init message.");
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    let _ = out_tx.send(ServerMessage::SessionReady {
        session_id: state.session_id,
    });

    // --- 2. Main Message Loop ---
    // Turns run to completion before the next frame is read: execution is
    // logically sequential per conversation, with no parallel transcript
    // mutation and no stream cancellation.
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::UserMessage { text }) => {
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        continue;
                    }
                    if let Err(e) = run_chat_turn(
                        &app_state.db,
                        &app_state.companion,
                        &mut state,
                        &out_tx,
                        &text,
                    )
                    .await
                    {
                        error!("Chat turn failed: {}", e);
                        let _ = out_tx.send(ServerMessage::Error {
                            message: "Something went wrong. Please try again.".to_string(),
                        });
                    }
                }
                Ok(ClientMessage::EndSession) => {
                    if let Some(session_id) = state.session_id.take() {
                        let outcome = run_session_wrapup(
                            &app_state.db,
                            &app_state.title_adapter,
                            &app_state.mood_adapter,
                            &app_state.insight_adapter,
                            user_id,
                            session_id,
                        )
                        .await;
                        let _ = out_tx.send(ServerMessage::WrapUpComplete {
                            title: outcome.title,
                            mood_notice: outcome.mood_notice,
                            insight_ready: outcome.insight_ready,
                        });
                    }
                    // The surface stays open on a fresh conversation.
                    state.transcript.clear();
                }
                Ok(ClientMessage::Init { .. }) => {
                    warn!("Received subsequent Init message, which is ignored.");
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- 3. Cleanup ---
    // A conversation left open on disconnect still gets its wrap-up,
    // fire-and-forget; there is no client left to notify.
    if let Some(session_id) = state.session_id.take() {
        let app_state = app_state.clone();
        tokio::spawn(async move {
            run_session_wrapup(
                &app_state.db,
                &app_state.title_adapter,
                &app_state.mood_adapter,
                &app_state.insight_adapter,
                user_id,
                session_id,
            )
            .await;
        });
    }

    drop(out_tx);
    let _ = forward_task.await;
    info!("WebSocket connection closed.");
}
