//! services/api/src/web/state.rs
//!
//! Defines the application's shared and session-specific states.

use crate::cache::DailyCache;
use crate::config::Config;
use mindhaven_core::domain::{ChatMessage, HomeContent};
use mindhaven_core::ports::{
    CompanionChatService, DatabaseService, GuidanceService, ImageGenerationService,
    InsightGenerationService, MoodInferenceService, PortError, PortResult,
    TitleGenerationService,
};
use std::sync::Arc;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub companion: Arc<dyn CompanionChatService>,
    pub title_adapter: Arc<dyn TitleGenerationService>,
    pub mood_adapter: Arc<dyn MoodInferenceService>,
    pub insight_adapter: Arc<dyn InsightGenerationService>,
    pub guidance_adapter: Arc<dyn GuidanceService>,
    pub image_adapter: Arc<dyn ImageGenerationService>,
    /// Daily caches for generated content, keyed by `(user, date)`. The tip
    /// cache additionally invalidates when the user's mood count changes.
    pub home_cache: Arc<DailyCache<HomeContent>>,
    pub tip_cache: Arc<DailyCache<String>>,
}

//=========================================================================================
// ChatSessionState (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active chat connection.
///
/// The in-memory transcript is the authoritative context for completion
/// requests on this conversation - a message appended moments ago but not
/// yet confirmed durable is still part of the next turn's context.
pub struct ChatSessionState {
    pub user_id: Uuid,
    /// `None` until the first user message lazily creates the session row.
    pub session_id: Option<Uuid>,
    pub transcript: Vec<ChatMessage>,
}

impl ChatSessionState {
    /// Starts a fresh conversation with no durable session yet.
    pub fn fresh(user_id: Uuid) -> Self {
        Self {
            user_id,
            session_id: None,
            transcript: Vec::new(),
        }
    }

    /// Resumes an existing conversation: validates ownership and loads the
    /// durable transcript into memory.
    pub async fn resume(
        db: &Arc<dyn DatabaseService>,
        user_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Self> {
        let session = db.get_chat_session(session_id).await?;
        if session.user_id != user_id {
            return Err(PortError::Unauthorized);
        }
        let transcript = db.messages_for_session(user_id, session_id).await?;
        Ok(Self {
            user_id,
            session_id: Some(session_id),
            transcript,
        })
    }
}
