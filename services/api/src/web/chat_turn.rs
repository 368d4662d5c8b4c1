//! services/api/src/web/chat_turn.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! one user chat turn: lazy session creation, durable append of the user
//! message, streamed completion consumption and the single final write of
//! the assistant's reply.

use crate::web::{protocol::ServerMessage, state::ChatSessionState};
use futures::StreamExt;
use mindhaven_core::domain::Sender;
use mindhaven_core::ports::{CompanionChatService, DatabaseService, PortResult};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

/// Substituted and persisted when the stream fails; the turn is never
/// retried automatically.
pub const APOLOGY_TEXT: &str = "I'm sorry, but I encountered an error. Please try again.";

/// Runs one chat turn against the in-memory transcript.
///
/// The transcript held in `state` - not a re-fetch from storage - seeds the
/// completion request. Fragments are forwarded to `out` as they arrive with
/// no partial-token buffering; the assistant message is persisted once, in
/// full, after stream close.
pub async fn run_chat_turn(
    db: &Arc<dyn DatabaseService>,
    companion: &Arc<dyn CompanionChatService>,
    state: &mut ChatSessionState,
    out: &UnboundedSender<ServerMessage>,
    text: &str,
) -> PortResult<()> {
    // A conversation gets its durable session row on the first message.
    // If creation fails the whole turn fails: no message without a session.
    let session_id = match state.session_id {
        Some(id) => id,
        None => {
            let session = db.create_chat_session(state.user_id).await?;
            info!("Created chat session {} lazily.", session.id);
            state.session_id = Some(session.id);
            let _ = out.send(ServerMessage::SessionStarted {
                session_id: session.id,
            });
            session.id
        }
    };

    // Snapshot the prior transcript for the completion request, then append
    // the user message to memory and storage.
    let prior = state.transcript.clone();
    let user_message = db
        .append_message(state.user_id, session_id, Sender::User, text)
        .await?;
    state.transcript.push(user_message);

    // Consume the stream. Any bytes received are treated as displayable
    // text; there is no cancellation, timeout or resumption.
    let mut accumulator = String::new();
    let mut stream_failed = false;
    match companion.stream_reply(&prior, text).await {
        Ok(mut stream) => {
            while let Some(fragment) = stream.next().await {
                match fragment {
                    Ok(chunk) => {
                        accumulator.push_str(&chunk);
                        let _ = out.send(ServerMessage::AssistantChunk { text: chunk });
                    }
                    Err(e) => {
                        error!("Companion stream failed mid-reply: {}", e);
                        stream_failed = true;
                        break;
                    }
                }
            }
        }
        Err(e) => {
            error!("Companion stream request failed: {}", e);
            stream_failed = true;
        }
    }

    let final_text = if stream_failed {
        APOLOGY_TEXT.to_string()
    } else {
        accumulator
    };

    // One durable write for the whole reply.
    let assistant_message = db
        .append_message(state.user_id, session_id, Sender::Ai, &final_text)
        .await?;
    state.transcript.push(assistant_message.clone());
    let _ = out.send(ServerMessage::AssistantDone {
        message: assistant_message,
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryDb, ScriptedCompanion};
    use mindhaven_core::ports::{CompanionChatService, DatabaseService};
    use std::sync::atomic::Ordering;
    use tokio::sync::mpsc;

    fn ports(
        db: MemoryDb,
        companion: ScriptedCompanion,
    ) -> (Arc<dyn DatabaseService>, Arc<dyn CompanionChatService>) {
        (Arc::new(db), Arc::new(companion))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn accumulates_chunks_into_one_persisted_message() {
        let db = MemoryDb::new();
        let user = db.seed_user("Jamie");
        let (db, companion) = ports(db, ScriptedCompanion::replying(&["Hel", "lo", " there"]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ChatSessionState::fresh(user);

        run_chat_turn(&db, &companion, &mut state, &tx, "hi").await.unwrap();

        let frames = drain(&mut rx);
        assert!(matches!(frames[0], ServerMessage::SessionStarted { .. }));
        let chunk_count = frames
            .iter()
            .filter(|f| matches!(f, ServerMessage::AssistantChunk { .. }))
            .count();
        assert_eq!(chunk_count, 3);

        let done = frames
            .iter()
            .find_map(|f| match f {
                ServerMessage::AssistantDone { message } => Some(message.clone()),
                _ => None,
            })
            .expect("final frame");
        assert_eq!(done.text, "Hello there");
        assert_eq!(done.sender, Sender::Ai);

        // Both turns are in memory and durable.
        assert_eq!(state.transcript.len(), 2);
        let stored = db
            .messages_for_session(user, state.session_id.unwrap())
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].text, "Hello there");
    }

    #[tokio::test]
    async fn mid_stream_error_persists_the_apology_not_a_fragment() {
        let db = MemoryDb::new();
        let user = db.seed_user("Jamie");
        let (db, companion) = ports(db, ScriptedCompanion::failing_mid_stream(&["He"]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ChatSessionState::fresh(user);

        run_chat_turn(&db, &companion, &mut state, &tx, "hi").await.unwrap();

        let stored = db
            .messages_for_session(user, state.session_id.unwrap())
            .await
            .unwrap();
        assert_eq!(stored[1].text, APOLOGY_TEXT);

        let done = drain(&mut rx)
            .into_iter()
            .find_map(|f| match f {
                ServerMessage::AssistantDone { message } => Some(message),
                _ => None,
            })
            .expect("final frame");
        assert_eq!(done.text, APOLOGY_TEXT);
    }

    #[tokio::test]
    async fn refused_stream_still_persists_the_apology() {
        let db = MemoryDb::new();
        let user = db.seed_user("Jamie");
        let (db, companion) = ports(db, ScriptedCompanion::refusing());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = ChatSessionState::fresh(user);

        run_chat_turn(&db, &companion, &mut state, &tx, "hi").await.unwrap();

        let stored = db
            .messages_for_session(user, state.session_id.unwrap())
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].text, APOLOGY_TEXT);
    }

    #[tokio::test]
    async fn reuses_the_session_and_feeds_prior_context() {
        let db = MemoryDb::new();
        let user = db.seed_user("Jamie");
        let companion = ScriptedCompanion::replying(&["ok"]);
        let (db, companion): (Arc<dyn DatabaseService>, Arc<ScriptedCompanion>) =
            (Arc::new(db), Arc::new(companion));
        let companion_port: Arc<dyn CompanionChatService> = companion.clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ChatSessionState::fresh(user);

        run_chat_turn(&db, &companion_port, &mut state, &tx, "first").await.unwrap();
        // First turn: no prior context.
        assert_eq!(companion.last_context_len.load(Ordering::SeqCst), 0);
        let first_session = state.session_id.unwrap();

        run_chat_turn(&db, &companion_port, &mut state, &tx, "second").await.unwrap();
        // Second turn: the user+assistant pair from turn one.
        assert_eq!(companion.last_context_len.load(Ordering::SeqCst), 2);
        assert_eq!(state.session_id.unwrap(), first_session);

        let started_count = drain(&mut rx)
            .iter()
            .filter(|f| matches!(f, ServerMessage::SessionStarted { .. }))
            .count();
        assert_eq!(started_count, 1);
    }
}
