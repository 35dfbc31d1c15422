//! Picks the slice of history handed downstream with a query.
//!
//! Follow-ups see only the latest assistant answer (recency-only). Independent
//! queries get a summary of the recent window produced by the external
//! summarizer.

use std::sync::Arc;
use tracing::{debug, info};

use crate::context_engine::summarizer::TranscriptSummarizer;
use crate::error::ContextError;
use crate::memory::{last_assistant_turn, valid_turns, ConversationTurn};
use crate::utils::TextUtils;

/// Follow-up with history but no assistant answer yet
pub const NO_RECENT_INFORMATION: &str = "No recent information available.";

/// Summarizer answered with nothing
pub const NO_RECENT_TOPIC: &str = "No recent topic discussed.";

pub struct HistorySelector {
    followup_context_chars: usize,
    history_window_turns: usize,
    summarizer: Arc<dyn TranscriptSummarizer>,
}

impl HistorySelector {
    pub fn new(
        followup_context_chars: usize,
        history_window_turns: usize,
        summarizer: Arc<dyn TranscriptSummarizer>,
    ) -> Self {
        Self {
            followup_context_chars,
            history_window_turns,
            summarizer,
        }
    }

    /// Context text for a query. Empty when there is no usable history.
    pub async fn select(&self, history: &[ConversationTurn], is_followup: bool) -> Result<String, ContextError> {
        if valid_turns(history).next().is_none() {
            debug!("No usable history, selecting empty context");
            return Ok(String::new());
        }

        if is_followup {
            Ok(self.followup_excerpt(history))
        } else {
            self.independent_context(history).await
        }
    }

    /// The most recent assistant answer, cut to the configured length
    pub fn followup_excerpt(&self, history: &[ConversationTurn]) -> String {
        match last_assistant_turn(history) {
            Some(turn) => {
                TextUtils::truncate_with_ellipsis(&turn.content, self.followup_context_chars).into_owned()
            }
            None => NO_RECENT_INFORMATION.to_string(),
        }
    }

    /// Last `history_window_turns` valid turns as "Role: content" paragraphs
    pub fn format_transcript(&self, history: &[ConversationTurn]) -> String {
        let turns: Vec<_> = valid_turns(history).collect();
        let start = turns.len().saturating_sub(self.history_window_turns);

        let mut transcript = String::new();
        for (role, turn) in &turns[start..] {
            transcript.push_str(role.label());
            transcript.push_str(": ");
            transcript.push_str(&turn.content);
            transcript.push_str("\n\n");
        }
        transcript
    }

    async fn independent_context(&self, history: &[ConversationTurn]) -> Result<String, ContextError> {
        let transcript = self.format_transcript(history);
        let summary = self.summarizer.summarize(&transcript).await?;
        let summary = summary.trim();

        if summary.is_empty() {
            return Ok(NO_RECENT_TOPIC.to_string());
        }
        info!("📝 Conversation context summarized ({} chars)", summary.chars().count());
        Ok(summary.to_string())
    }
}
