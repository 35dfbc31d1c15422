//! Conversation turns and the history store the engine reads from.

use serde::{Deserialize, Serialize};
use dashmap::DashMap;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::ConversationError;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Label used when rendering a transcript
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One turn of a conversation as handed over by the persistence layer.
///
/// The role stays a raw string: entries with a missing or unknown role are
/// skipped by the engine instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn parsed_role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

/// Turns with a recognised role, in their original order
pub fn valid_turns<'a>(
    history: &'a [ConversationTurn],
) -> impl DoubleEndedIterator<Item = (Role, &'a ConversationTurn)> + 'a {
    history
        .iter()
        .filter_map(|turn| turn.parsed_role().map(|role| (role, turn)))
}

/// Most recent assistant turn, skipping malformed entries
pub fn last_assistant_turn(history: &[ConversationTurn]) -> Option<&ConversationTurn> {
    valid_turns(history)
        .rev()
        .find(|(role, _)| *role == Role::Assistant)
        .map(|(_, turn)| turn)
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Read/append access to per-user conversation history.
pub trait ConversationStore: Send + Sync {
    fn create_conversation(&self, user_id: i64, title: Option<String>) -> ConversationSummary;
    fn append_turn(
        &self,
        user_id: i64,
        conversation_id: i64,
        turn: ConversationTurn,
    ) -> Result<(), ConversationError>;
    /// Chronological history, only if the conversation belongs to `user_id`
    fn history(&self, user_id: i64, conversation_id: i64) -> Result<Vec<ConversationTurn>, ConversationError>;
}

struct ConversationRecord {
    summary: ConversationSummary,
    turns: Vec<ConversationTurn>,
}

#[derive(Clone)]
pub struct InMemoryConversationStore {
    store: Arc<DashMap<i64, ConversationRecord>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn create_conversation(&self, user_id: i64, title: Option<String>) -> ConversationSummary {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let summary = ConversationSummary {
            id,
            user_id,
            title: title.unwrap_or_else(|| "New Chat".to_string()),
            created_at: Utc::now(),
        };
        self.store.insert(id, ConversationRecord {
            summary: summary.clone(),
            turns: Vec::new(),
        });
        debug!("Created conversation {} for user {}", id, user_id);
        summary
    }

    fn append_turn(
        &self,
        user_id: i64,
        conversation_id: i64,
        turn: ConversationTurn,
    ) -> Result<(), ConversationError> {
        if turn.parsed_role().is_none() {
            return Err(ConversationError::InvalidRole(turn.role));
        }
        match self.store.get_mut(&conversation_id) {
            Some(mut record) if record.summary.user_id == user_id => {
                record.turns.push(turn);
                Ok(())
            }
            _ => Err(ConversationError::NotFound(conversation_id)),
        }
    }

    fn history(&self, user_id: i64, conversation_id: i64) -> Result<Vec<ConversationTurn>, ConversationError> {
        match self.store.get(&conversation_id) {
            Some(record) if record.summary.user_id == user_id => Ok(record.turns.clone()),
            _ => Err(ConversationError::NotFound(conversation_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_lenient_about_case() {
        assert_eq!(Role::parse("Assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse(" user "), Some(Role::User));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_missing_role_deserializes_and_is_skipped() {
        let history: Vec<ConversationTurn> = serde_json::from_str(
            r#"[{"content": "orphan"}, {"role": "assistant", "content": "answer"}, {"role": "user"}]"#,
        )
        .unwrap();

        assert_eq!(history.len(), 3);
        let roles: Vec<Role> = valid_turns(&history).map(|(role, _)| role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User]);
    }

    #[test]
    fn test_last_assistant_turn_scans_backwards() {
        let history = vec![
            ConversationTurn::assistant("first"),
            ConversationTurn::user("question"),
            ConversationTurn::assistant("second"),
            ConversationTurn::user("follow up"),
            ConversationTurn { role: "bogus".into(), content: "ignored".into() },
        ];
        assert_eq!(last_assistant_turn(&history).map(|t| t.content.as_str()), Some("second"));
        assert!(last_assistant_turn(&[ConversationTurn::user("hi")]).is_none());
    }

    #[test]
    fn test_store_enforces_ownership() {
        let store = InMemoryConversationStore::new();
        let conv = store.create_conversation(7, None);
        assert_eq!(conv.title, "New Chat");

        store.append_turn(7, conv.id, ConversationTurn::user("hello")).unwrap();
        assert_eq!(store.history(7, conv.id).unwrap().len(), 1);

        assert_eq!(store.history(8, conv.id), Err(ConversationError::NotFound(conv.id)));
        assert_eq!(
            store.append_turn(8, conv.id, ConversationTurn::user("intrude")),
            Err(ConversationError::NotFound(conv.id))
        );
    }

    #[test]
    fn test_store_rejects_unknown_roles() {
        let store = InMemoryConversationStore::new();
        let conv = store.create_conversation(1, Some("Diet".into()));
        let result = store.append_turn(1, conv.id, ConversationTurn {
            role: "system".into(),
            content: "x".into(),
        });
        assert_eq!(result, Err(ConversationError::InvalidRole("system".into())));
    }
}
