// mama/crates/mama-engine/src/lib.rs

pub mod config;
pub mod context_engine;
pub mod error;
pub mod memory;
pub mod session;
pub mod shared_state;
pub mod telemetry;
pub mod utils;
pub mod worker_threads;

#[cfg(feature = "cli")]
pub mod api;
#[cfg(feature = "cli")]
pub mod metrics;
#[cfg(feature = "cli")]
pub mod server;

// Public API exports
pub use config::Config;
pub use context_engine::{ContextDecision, ContextSelector, SelectionRequest, SelectorConfig};
pub use error::{AuthError, ContextError, ConversationError, SummarizerError};
pub use memory::{ConversationStore, ConversationTurn, InMemoryConversationStore, Role};
pub use session::{Identity, SessionStore, SessionStoreConfig};

#[cfg(feature = "cli")]
pub use server::run_server;
