//! Shared state handed to every request handler
//!
//! Each subsystem is owned once and reached through an `Arc`; the session
//! store does its own locking and the selector is stateless.

use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    context_engine::{ContextSelector, TranscriptSummarizer},
    memory::{ConversationStore, InMemoryConversationStore},
    session::{CredentialValidator, NoCredentialBackend, SessionStore},
    worker_threads::{AuthWorker, LLMWorker},
};

/// Core shared system state container
pub struct SharedSystemState {
    /// Configuration (read-only after initialization)
    pub config: Arc<Config>,

    /// Live sessions
    pub sessions: Arc<SessionStore>,

    /// Conversation history fed to the selector
    pub conversations: Arc<dyn ConversationStore>,

    /// Per-query context and language decisions
    pub selector: Arc<ContextSelector>,

    /// Login check run before a session is issued
    pub credentials: Arc<dyn CredentialValidator>,
}

impl SharedSystemState {
    /// Wire every subsystem from configuration, summarizing through the
    /// configured LLM backend.
    pub fn new(config: Config) -> Self {
        let summarizer = Arc::new(LLMWorker::new(
            config.summarizer_url.clone(),
            config.summarizer_model.clone(),
        ));
        Self::with_summarizer(config, summarizer)
    }

    pub fn with_summarizer(config: Config, summarizer: Arc<dyn TranscriptSummarizer>) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_config()));
        let selector = Arc::new(ContextSelector::new(config.selector_config(), summarizer));
        let credentials: Arc<dyn CredentialValidator> = match &config.auth_validator_url {
            Some(url) => Arc::new(AuthWorker::new(url.clone())),
            None => Arc::new(NoCredentialBackend),
        };
        Self::from_parts(
            config,
            sessions,
            Arc::new(InMemoryConversationStore::new()),
            selector,
            credentials,
        )
    }

    pub fn from_parts(
        config: Config,
        sessions: Arc<SessionStore>,
        conversations: Arc<dyn ConversationStore>,
        selector: Arc<ContextSelector>,
        credentials: Arc<dyn CredentialValidator>,
    ) -> Self {
        info!("Shared state initialized");
        Self {
            config: Arc::new(config),
            sessions,
            conversations,
            selector,
            credentials,
        }
    }

    /// Replace the login check, e.g. with an in-process user directory
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialValidator>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// State type used by the Axum router
#[derive(Clone)]
pub struct UnifiedAppState {
    pub shared_state: Arc<SharedSystemState>,
}

impl UnifiedAppState {
    pub fn new(shared_state: Arc<SharedSystemState>) -> Self {
        Self { shared_state }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.shared_state.sessions
    }

    pub fn conversations(&self) -> &dyn ConversationStore {
        self.shared_state.conversations.as_ref()
    }

    pub fn selector(&self) -> &ContextSelector {
        &self.shared_state.selector
    }

    pub fn credentials(&self) -> &dyn CredentialValidator {
        self.shared_state.credentials.as_ref()
    }

    pub fn cookie_name(&self) -> &str {
        &self.shared_state.config.session_cookie_name
    }
}

// Re-exports for convenience
pub use self::SharedSystemState as SharedState;
