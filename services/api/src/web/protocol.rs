//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the companion chat surface.

use mindhaven_core::domain::ChatMessage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Initializes the connection. This must be the first message sent.
    /// `session_id: None` opens a fresh conversation; the session row is
    /// created lazily when the first user message arrives.
    Init { session_id: Option<Uuid> },

    /// One user chat turn.
    UserMessage { text: String },

    /// The user is leaving the chat surface; run the end-of-session
    /// wrap-up and report its outcome.
    EndSession,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms connection initialization. Echoes the resumed session id,
    /// or `None` for a fresh conversation.
    SessionReady { session_id: Option<Uuid> },

    /// A session row was just created for this conversation. The client
    /// should remember the id for future `Init` calls.
    SessionStarted { session_id: Uuid },

    /// One streamed fragment of the assistant's reply. The client appends
    /// it to the in-flight message text.
    AssistantChunk { text: String },

    /// The assistant's reply is complete and persisted; the in-flight
    /// message should be replaced with this final one.
    AssistantDone { message: ChatMessage },

    /// Outcome of the end-of-session wrap-up, for transient notices.
    WrapUpComplete {
        title: Option<String>,
        mood_notice: Option<String>,
        insight_ready: bool,
    },

    /// Reports an error to the client, which should display a message.
    Error { message: String },
}
