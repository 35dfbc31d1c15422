// mama/crates/mama-engine/src/api/mod.rs
//! HTTP surface over the session store and the context selector

pub mod auth;
pub mod context_api;
pub mod conversation_api;
pub mod session_api;

// Re-export API handlers
pub use auth::{cookie_value, expired_cookie, issue_session, AuthRejection, AuthenticatedUser};
pub use context_api::{select_context, SelectContextRequest, SelectContextResponse};
pub use conversation_api::{append_turn, create_conversation, get_turns};
pub use session_api::{login, logout, me, LoginRequest};
