pub mod auth;
pub mod chat_turn;
pub mod guidance;
pub mod insights;
pub mod middleware;
pub mod moods;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod wrapup;
pub mod ws_handler;

// Re-export the main WebSocket handler and middleware to make them easily
// accessible to the binary that builds the web server router.
pub use middleware::require_auth;
pub use rest::{delete_session_handler, list_sessions_handler, session_messages_handler};
pub use ws_handler::ws_handler;
