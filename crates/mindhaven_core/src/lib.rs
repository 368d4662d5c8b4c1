pub mod domain;
pub mod ports;

pub use domain::{
    AuthSession, ChatMessage, ChatSession, DailyFocus, DailyQuote, HomeContent, InsightDraft,
    Mood, MoodEntry, MoodInference, MoodInsight, MoodReflection, ReportObservations, ReportTheme,
    Sender, Suggestion, SuggestionTarget, User, UserCredentials, WeeklyInsight, WeeklyReport,
};
pub use ports::{
    ChunkStream, CompanionChatService, DatabaseService, GuidanceService, ImageGenerationService,
    InsightGenerationService, MoodInferenceService, PortError, PortResult, TitleGenerationService,
};
