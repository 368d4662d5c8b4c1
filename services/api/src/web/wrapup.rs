//! services/api/src/web/wrapup.rs
//!
//! End-of-session wrap-up: when the user leaves the chat surface, three
//! derived computations run over the finished conversation - title
//! generation, mood inference and the weekly-insight eligibility check.
//! They are independent concurrent tasks; a failure in one never blocks or
//! fails the others. Each reads the one transcript snapshot fetched at the
//! start of the wrap-up.

use chrono::{Duration, Utc};
use mindhaven_core::domain::{ChatMessage, Sender, WeeklyInsight};
use mindhaven_core::ports::{
    DatabaseService, InsightGenerationService, MoodInferenceService, TitleGenerationService,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Conversations below this size carry too little signal; the wrap-up is a
/// complete no-op for them.
pub const SESSION_MIN_MESSAGES: usize = 2;
/// Title generation reads only the opening of the conversation.
pub const TITLE_CONTEXT_MESSAGES: usize = 8;
/// Mood inference reads only the tail of the conversation.
pub const MOOD_CONTEXT_MESSAGES: usize = 6;

/// Weekly-insight eligibility thresholds. Fixed constants, not per-user
/// configuration.
pub const INSIGHT_WINDOW_DAYS: i64 = 7;
pub const INSIGHT_TRIGGER_DAYS: i64 = 3;
pub const INSIGHT_MIN_USER_MESSAGES: usize = 10;

/// What the wrap-up produced, for transient client notices.
#[derive(Debug, Default, Clone)]
pub struct WrapUpOutcome {
    pub title: Option<String>,
    pub mood_notice: Option<String>,
    pub insight_ready: bool,
}

/// Runs the full end-of-session wrap-up for one finished conversation.
pub async fn run_session_wrapup(
    db: &Arc<dyn DatabaseService>,
    titles: &Arc<dyn TitleGenerationService>,
    moods: &Arc<dyn MoodInferenceService>,
    insights: &Arc<dyn InsightGenerationService>,
    user_id: Uuid,
    session_id: Uuid,
) -> WrapUpOutcome {
    // The durable transcript, not the in-memory one: it includes everything.
    let transcript = match db.messages_for_session(user_id, session_id).await {
        Ok(transcript) => transcript,
        Err(e) => {
            error!("Failed to fetch transcript for wrap-up: {}", e);
            return WrapUpOutcome::default();
        }
    };

    if transcript.len() < SESSION_MIN_MESSAGES {
        return WrapUpOutcome::default();
    }

    let (title, mood_notice, insight) = tokio::join!(
        generate_and_save_title(db, titles, session_id, &transcript),
        analyze_and_log_mood(db, moods, user_id, session_id, &transcript),
        check_and_generate_weekly_insight(db, insights, user_id),
    );

    WrapUpOutcome {
        title,
        mood_notice,
        insight_ready: insight.is_some(),
    }
}

/// Assigns a human-readable label to the session exactly once.
///
/// The existing-title check is the idempotency guard; a failed or empty
/// generation leaves the title unset, to be retried only by a future
/// wrap-up of a still-untitled session.
async fn generate_and_save_title(
    db: &Arc<dyn DatabaseService>,
    titles: &Arc<dyn TitleGenerationService>,
    session_id: Uuid,
    transcript: &[ChatMessage],
) -> Option<String> {
    let session = match db.get_chat_session(session_id).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Could not fetch session {} to check for title: {}", session_id, e);
            return None;
        }
    };
    if session.title.is_some() {
        return None;
    }

    let excerpt = &transcript[..transcript.len().min(TITLE_CONTEXT_MESSAGES)];
    let raw = match titles.generate_title(excerpt).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            error!("Title generation failed for session {}: {}", session_id, e);
            return None;
        }
    };

    let title = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string();
    if title.is_empty() {
        return None;
    }

    if let Err(e) = db.set_session_title(session_id, &title).await {
        error!("Failed to save title for session {}: {}", session_id, e);
        return None;
    }
    Some(title)
}

/// Maintains at most one mood entry per chat session, inferred from the
/// conversation tail. No classification means no write.
async fn analyze_and_log_mood(
    db: &Arc<dyn DatabaseService>,
    moods: &Arc<dyn MoodInferenceService>,
    user_id: Uuid,
    session_id: Uuid,
    transcript: &[ChatMessage],
) -> Option<String> {
    let existing = match db.mood_for_session(user_id, session_id).await {
        Ok(existing) => existing,
        Err(e) => {
            error!("Error checking for existing mood log: {}", e);
            return None;
        }
    };

    let tail_start = transcript.len().saturating_sub(MOOD_CONTEXT_MESSAGES);
    let inference = match moods.infer_mood(&transcript[tail_start..]).await {
        Ok(Some(inference)) => inference,
        Ok(None) => return None,
        Err(e) => {
            error!("Mood inference failed for session {}: {}", session_id, e);
            return None;
        }
    };

    let notes = inference.notes.trim();
    let notes = (!notes.is_empty()).then_some(notes);

    match existing {
        Some(entry) => match db.update_mood(entry.id, inference.mood, notes).await {
            Ok(updated) => Some(format!(
                "I've updated your mood to \"{}\" based on our chat.",
                updated.mood.label()
            )),
            Err(e) => {
                error!("Failed to update mood entry {}: {}", entry.id, e);
                None
            }
        },
        None => match db.insert_mood(user_id, inference.mood, notes, Some(session_id)).await {
            Ok(Some(entry)) => Some(format!(
                "Based on our chat, I've logged your mood as \"{}\".",
                entry.mood.label()
            )),
            // A concurrent wrap-up beat us to the insert; same as existing.
            Ok(None) => None,
            Err(e) => {
                error!("Failed to log inferred mood: {}", e);
                None
            }
        },
    }
}

/// Produces the weekly digest at most once per rolling 7-day window,
/// gated by engagement thresholds. Every check short-circuits silently.
async fn check_and_generate_weekly_insight(
    db: &Arc<dyn DatabaseService>,
    insights: &Arc<dyn InsightGenerationService>,
    user_id: Uuid,
) -> Option<WeeklyInsight> {
    let today = Utc::now().date_naive();
    let window_start = today - Duration::days(INSIGHT_WINDOW_DAYS);
    let since = Utc::now() - Duration::days(INSIGHT_WINDOW_DAYS);

    // 1. A report for this window already exists.
    match db.insight_exists_since(user_id, window_start).await {
        Ok(true) => return None,
        Ok(false) => {}
        Err(e) => {
            error!("Error checking for existing insights: {}", e);
            return None;
        }
    }

    // 2. Engagement breadth: distinct chat days, via the store aggregate.
    let distinct_days = match db.distinct_chat_days_since(user_id, since).await {
        Ok(days) => days,
        Err(e) => {
            error!("Error checking distinct days for insight: {}", e);
            return None;
        }
    };
    if distinct_days < INSIGHT_TRIGGER_DAYS {
        return None;
    }

    // 3. Engagement volume: fetch history only once breadth is met.
    let history = match db.messages_since(user_id, since).await {
        Ok(history) => history,
        Err(e) => {
            error!("Error fetching chat history for insight generation: {}", e);
            return None;
        }
    };
    let user_messages = history.iter().filter(|m| m.sender == Sender::User).count();
    if user_messages < INSIGHT_MIN_USER_MESSAGES {
        return None;
    }

    // 4. One completion call synthesizes the report.
    let user_name = match db.get_user(user_id).await {
        Ok(user) => user.display_name,
        Err(_) => "friend".to_string(),
    };
    let draft = match insights.generate_report(&history, &user_name).await {
        Ok(draft) => draft,
        Err(e) => {
            error!("Failed to get a weekly report from the completion service: {}", e);
            return None;
        }
    };

    // 5. Persist; a unique-index rejection means another device won the
    // race, which is the same as "already exists".
    match db
        .insert_weekly_insight(user_id, window_start, today, &draft.report, &draft.image_prompts)
        .await
    {
        Ok(Some(insight)) => {
            info!("Generated weekly insight {} for user {}.", insight.id, user_id);
            Some(insight)
        }
        Ok(None) => None,
        Err(e) => {
            error!("Error saving new weekly insight: {}", e);
            None
        }
    }
}
