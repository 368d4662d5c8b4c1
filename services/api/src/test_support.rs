//! services/api/src/test_support.rs
//!
//! In-memory fakes for the core ports, shared by the unit tests across the
//! web modules. `MemoryDb` mirrors the store's observable semantics
//! (ownership scoping, unique-index rejections, the distinct-days
//! aggregate) and counts every write so tests can assert "zero writes".

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use mindhaven_core::domain::{
    ChatMessage, ChatSession, InsightDraft, Mood, MoodEntry, MoodInference, Sender, User,
    UserCredentials, WeeklyInsight, WeeklyReport,
};
use mindhaven_core::ports::{
    ChunkStream, CompanionChatService, DatabaseService, InsightGenerationService,
    MoodInferenceService, PortError, PortResult, TitleGenerationService,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// MemoryDb
//=========================================================================================

#[derive(Default)]
pub struct MemoryDb {
    pub users: Mutex<Vec<User>>,
    pub sessions: Mutex<Vec<ChatSession>>,
    pub messages: Mutex<Vec<ChatMessage>>,
    pub moods: Mutex<Vec<MoodEntry>>,
    pub insights: Mutex<Vec<WeeklyInsight>>,
    /// Number of mutating calls made against the store.
    pub writes: AtomicUsize,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    // --- Seeding helpers (not counted as writes) ---

    pub fn seed_user(&self, display_name: &str) -> Uuid {
        let user = User {
            user_id: Uuid::new_v4(),
            email: format!("{}@example.com", display_name.to_lowercase()),
            display_name: display_name.to_string(),
        };
        let id = user.user_id;
        self.users.lock().unwrap().push(user);
        id
    }

    pub fn seed_session(&self, user_id: Uuid, title: Option<&str>) -> Uuid {
        let session = ChatSession {
            id: Uuid::new_v4(),
            user_id,
            title: title.map(|t| t.to_string()),
            created_at: Utc::now(),
        };
        let id = session.id;
        self.sessions.lock().unwrap().push(session);
        id
    }

    pub fn seed_message_at(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sender: Sender,
        text: &str,
        created_at: DateTime<Utc>,
    ) {
        self.messages.lock().unwrap().push(ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            user_id,
            sender,
            text: text.to_string(),
            created_at,
        });
    }

    /// Seeds an alternating user/companion conversation of `count` messages,
    /// spaced one second apart ending now.
    pub fn seed_conversation(&self, user_id: Uuid, session_id: Uuid, count: usize) {
        let base = Utc::now() - Duration::seconds(count as i64);
        for i in 0..count {
            let sender = if i % 2 == 0 { Sender::User } else { Sender::Ai };
            self.seed_message_at(
                user_id,
                session_id,
                sender,
                &format!("message {}", i),
                base + Duration::seconds(i as i64),
            );
        }
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_user_with_email(
        &self,
        display_name: &str,
        email: &str,
        _hashed_password: &str,
    ) -> PortResult<User> {
        self.record_write();
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.to_string(),
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, _email: &str) -> PortResult<UserCredentials> {
        unimplemented!("not exercised by these tests")
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn update_account(
        &self,
        _user_id: Uuid,
        _display_name: Option<&str>,
        _hashed_password: Option<&str>,
    ) -> PortResult<()> {
        unimplemented!("not exercised by these tests")
    }

    async fn create_auth_session(
        &self,
        _session_id: &str,
        _user_id: Uuid,
        _expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        unimplemented!("not exercised by these tests")
    }

    async fn validate_auth_session(&self, _session_id: &str) -> PortResult<Uuid> {
        unimplemented!("not exercised by these tests")
    }

    async fn delete_auth_session(&self, _session_id: &str) -> PortResult<()> {
        unimplemented!("not exercised by these tests")
    }

    async fn create_chat_session(&self, user_id: Uuid) -> PortResult<ChatSession> {
        self.record_write();
        let session = ChatSession {
            id: Uuid::new_v4(),
            user_id,
            title: None,
            created_at: Utc::now(),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn get_chat_session(&self, session_id: Uuid) -> PortResult<ChatSession> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn list_chat_sessions(&self, user_id: Uuid) -> PortResult<Vec<ChatSession>> {
        let mut sessions: Vec<ChatSession> = self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn set_session_title(&self, session_id: Uuid, title: &str) -> PortResult<()> {
        self.record_write();
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;
        session.title = Some(title.to_string());
        Ok(())
    }

    async fn delete_chat_session(&self, user_id: Uuid, session_id: Uuid) -> PortResult<()> {
        self.record_write();
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| !(s.id == session_id && s.user_id == user_id));
        if sessions.len() == before {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        self.messages
            .lock()
            .unwrap()
            .retain(|m| m.session_id != session_id);
        Ok(())
    }

    async fn append_message(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        sender: Sender,
        text: &str,
    ) -> PortResult<ChatMessage> {
        self.record_write();
        let message = ChatMessage {
            id: Uuid::new_v4(),
            session_id,
            user_id,
            sender,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn messages_for_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id && m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn messages_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id && m.created_at >= since)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn distinct_chat_days_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64> {
        let days: BTreeSet<NaiveDate> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id && m.created_at >= since)
            .map(|m| m.created_at.date_naive())
            .collect();
        Ok(days.len() as i64)
    }

    async fn insert_mood(
        &self,
        user_id: Uuid,
        mood: Mood,
        notes: Option<&str>,
        session_id: Option<Uuid>,
    ) -> PortResult<Option<MoodEntry>> {
        let mut moods = self.moods.lock().unwrap();
        if session_id.is_some()
            && moods
                .iter()
                .any(|m| m.user_id == user_id && m.session_id == session_id)
        {
            return Ok(None);
        }
        self.record_write();
        let entry = MoodEntry {
            id: Uuid::new_v4(),
            user_id,
            mood,
            notes: notes.map(|n| n.to_string()),
            session_id,
            created_at: Utc::now(),
        };
        moods.push(entry.clone());
        Ok(Some(entry))
    }

    async fn update_mood(
        &self,
        mood_id: Uuid,
        mood: Mood,
        notes: Option<&str>,
    ) -> PortResult<MoodEntry> {
        self.record_write();
        let mut moods = self.moods.lock().unwrap();
        let entry = moods
            .iter_mut()
            .find(|m| m.id == mood_id)
            .ok_or_else(|| PortError::NotFound(format!("Mood entry {} not found", mood_id)))?;
        entry.mood = mood;
        entry.notes = notes.map(|n| n.to_string());
        Ok(entry.clone())
    }

    async fn mood_for_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<Option<MoodEntry>> {
        Ok(self
            .moods
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.user_id == user_id && m.session_id == Some(session_id))
            .cloned())
    }

    async fn list_moods(&self, user_id: Uuid) -> PortResult<Vec<MoodEntry>> {
        let mut moods: Vec<MoodEntry> = self
            .moods
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        moods.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(moods)
    }

    async fn count_moods(&self, user_id: Uuid) -> PortResult<i64> {
        Ok(self
            .moods
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id)
            .count() as i64)
    }

    async fn insert_weekly_insight(
        &self,
        user_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        report: &WeeklyReport,
        image_prompts: &[String],
    ) -> PortResult<Option<WeeklyInsight>> {
        let mut insights = self.insights.lock().unwrap();
        if insights
            .iter()
            .any(|i| i.user_id == user_id && i.start_date == start_date)
        {
            return Ok(None);
        }
        self.record_write();
        let insight = WeeklyInsight {
            id: Uuid::new_v4(),
            user_id,
            start_date,
            end_date,
            report: report.clone(),
            image_prompts: image_prompts.to_vec(),
            created_at: Utc::now(),
        };
        insights.push(insight.clone());
        Ok(Some(insight))
    }

    async fn insight_exists_since(
        &self,
        user_id: Uuid,
        window_start: NaiveDate,
    ) -> PortResult<bool> {
        Ok(self
            .insights
            .lock()
            .unwrap()
            .iter()
            .any(|i| i.user_id == user_id && i.start_date >= window_start))
    }

    async fn list_weekly_insights(&self, user_id: Uuid) -> PortResult<Vec<WeeklyInsight>> {
        let mut insights: Vec<WeeklyInsight> = self
            .insights
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        insights.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(insights)
    }

    async fn latest_weekly_insight(&self, user_id: Uuid) -> PortResult<Option<WeeklyInsight>> {
        Ok(self.list_weekly_insights(user_id).await?.into_iter().next())
    }
}

//=========================================================================================
// Completion-service fakes
//=========================================================================================

/// A companion that replies with a scripted chunk sequence, or refuses the
/// connection entirely.
pub struct ScriptedCompanion {
    /// `Err(text)` becomes a `PortError::Unexpected` mid-stream.
    pub chunks: Vec<Result<String, String>>,
    pub fail_on_connect: bool,
    pub calls: AtomicUsize,
    /// Length of the transcript slice received on the last call.
    pub last_context_len: AtomicUsize,
}

impl ScriptedCompanion {
    pub fn replying(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
            fail_on_connect: false,
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        }
    }

    pub fn failing_mid_stream(chunks: &[&str]) -> Self {
        let mut scripted: Vec<Result<String, String>> =
            chunks.iter().map(|c| Ok(c.to_string())).collect();
        scripted.push(Err("connection reset".to_string()));
        Self {
            chunks: scripted,
            fail_on_connect: false,
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        }
    }

    pub fn refusing() -> Self {
        Self {
            chunks: Vec::new(),
            fail_on_connect: true,
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompanionChatService for ScriptedCompanion {
    async fn stream_reply(
        &self,
        transcript: &[ChatMessage],
        _message: &str,
    ) -> PortResult<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_context_len
            .store(transcript.len(), Ordering::SeqCst);
        if self.fail_on_connect {
            return Err(PortError::Unexpected("connect refused".to_string()));
        }
        let items: Vec<Result<String, PortError>> = self
            .chunks
            .iter()
            .map(|chunk| match chunk {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(PortError::Unexpected(e.clone())),
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// A title service returning a fixed reply.
pub struct StaticTitle {
    pub reply: Option<String>,
    pub calls: AtomicUsize,
    pub last_context_len: AtomicUsize,
}

impl StaticTitle {
    pub fn replying(title: &str) -> Self {
        Self {
            reply: Some(title.to_string()),
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TitleGenerationService for StaticTitle {
    async fn generate_title(&self, messages: &[ChatMessage]) -> PortResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_context_len
            .store(messages.len(), Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// A mood-inference service returning a fixed classification.
pub struct StaticMood {
    pub reply: Option<MoodInference>,
    pub calls: AtomicUsize,
    pub last_context_len: AtomicUsize,
}

impl StaticMood {
    pub fn classifying(mood: Mood, notes: &str) -> Self {
        Self {
            reply: Some(MoodInference {
                mood,
                notes: notes.to_string(),
            }),
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        }
    }

    pub fn undecided() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MoodInferenceService for StaticMood {
    async fn infer_mood(&self, messages: &[ChatMessage]) -> PortResult<Option<MoodInference>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_context_len
            .store(messages.len(), Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

/// An insight service returning a fixed draft, or a transport failure.
pub struct StaticInsight {
    pub draft: Option<InsightDraft>,
    pub calls: AtomicUsize,
}

impl StaticInsight {
    pub fn drafting() -> Self {
        Self {
            draft: Some(InsightDraft {
                report: sample_report(),
                image_prompts: vec!["a quiet shoreline".to_string(), "morning fog".to_string()],
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            draft: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InsightGenerationService for StaticInsight {
    async fn generate_report(
        &self,
        _messages: &[ChatMessage],
        _user_name: &str,
    ) -> PortResult<InsightDraft> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.draft
            .clone()
            .ok_or_else(|| PortError::Unexpected("report generation failed".to_string()))
    }
}

pub fn sample_report() -> WeeklyReport {
    use mindhaven_core::domain::{ReportObservations, ReportTheme};
    WeeklyReport {
        opening: "A week of small steps.".to_string(),
        key_themes: vec![ReportTheme {
            theme: "Routine".to_string(),
            summary: "Daily check-ins kept momentum.".to_string(),
        }],
        emotional_landscape: "Mostly steady.".to_string(),
        observations: ReportObservations {
            strength: "Consistency".to_string(),
            pattern: "Midweek dips".to_string(),
        },
        suggestions: vec![],
    }
}
