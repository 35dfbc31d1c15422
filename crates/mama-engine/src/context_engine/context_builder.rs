//! The context decision and the downstream instructions rendered from it

use serde::Serialize;
use tracing::debug;

use crate::context_engine::followup_classifier::FollowupRule;
use crate::context_engine::language::LanguageCode;

/// Per-query output of the context selector. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextDecision {
    pub is_followup: bool,
    pub selected_context: String,
    pub resolved_language: LanguageCode,
    pub show_sources: bool,
    /// Language carried over from the previous answer
    pub language_locked: bool,
    /// Greeting with no prior conversation
    pub greeting_without_history: bool,
    /// Produced by the fallback path after an internal failure
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followup_rule: Option<FollowupRule>,
}

/// Sources are cited only for informational answers backed by passages
pub fn show_sources(has_retrieved_passages: bool, is_greeting: bool, is_non_informational: bool) -> bool {
    has_retrieved_passages && !is_greeting && !is_non_informational
}

/// Instruction blocks for the response-generation prompt. `None` means the
/// block is omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptInstructions {
    pub context: Option<String>,
    pub language: Option<String>,
    pub greeting: Option<String>,
}

impl PromptInstructions {
    /// All present blocks joined by blank lines
    pub fn render(&self) -> String {
        [&self.context, &self.language, &self.greeting]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

const FOLLOWUP_ANCHOR: &str = "FOLLOW-UP DETECTED: The user is asking about the RECENT CONTEXT above. \
Answer STRICTLY about that topic. DO NOT introduce new information unless directly relevant. \
DO NOT change topics. Expand on what was just discussed.";

const USER_CONTEXT_ANCHOR: &str = "IMPORTANT: The USER CONTEXT above contains facts the user shared earlier. \
USE these facts to answer the current question. DO NOT ask for information that's already provided \
in the context.";

const GREETING_INSTRUCTION: &str = "GREETING DETECTED: The user has ONLY greeted you. \
Respond in ENGLISH with ONLY a warm, brief greeting. DO NOT include any medical information.";

/// Renders [`PromptInstructions`] for a decision
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    default_language: LanguageCode,
}

impl ContextBuilder {
    pub fn new(default_language: LanguageCode) -> Self {
        Self { default_language }
    }

    pub fn build(&self, decision: &ContextDecision) -> PromptInstructions {
        let instructions = PromptInstructions {
            context: self.context_instruction(decision),
            language: self.language_instruction(decision),
            greeting: decision
                .greeting_without_history
                .then(|| GREETING_INSTRUCTION.to_string()),
        };
        debug!(
            "Built instructions (context: {}, language: {}, greeting: {})",
            instructions.context.is_some(),
            instructions.language.is_some(),
            instructions.greeting.is_some()
        );
        instructions
    }

    fn context_instruction(&self, decision: &ContextDecision) -> Option<String> {
        if decision.selected_context.is_empty() {
            return None;
        }
        let block = if decision.is_followup {
            format!(
                "RECENT CONTEXT (CRITICAL - THIS IS WHAT USER IS ASKING ABOUT):\nRecent context: {}\n\n{}",
                decision.selected_context, FOLLOWUP_ANCHOR
            )
        } else {
            format!(
                "USER CONTEXT (CRITICAL - USE THIS INFORMATION):\n{}\n\n{}",
                decision.selected_context, USER_CONTEXT_ANCHOR
            )
        };
        Some(block)
    }

    fn language_instruction(&self, decision: &ContextDecision) -> Option<String> {
        if decision.greeting_without_history || decision.resolved_language == self.default_language {
            return None;
        }
        let name = decision.resolved_language.display_name();
        let block = if decision.is_followup {
            format!(
                "LANGUAGE LOCK: Continue responding in {} (same as previous response). DO NOT switch languages.",
                name
            )
        } else {
            format!("LANGUAGE: Respond in {}.", name)
        };
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(is_followup: bool, context: &str, language: &str) -> ContextDecision {
        ContextDecision {
            is_followup,
            selected_context: context.to_string(),
            resolved_language: LanguageCode::parse(language).unwrap(),
            show_sources: true,
            language_locked: false,
            greeting_without_history: false,
            degraded: false,
            followup_rule: None,
        }
    }

    fn builder() -> ContextBuilder {
        ContextBuilder::new(LanguageCode::parse("en").unwrap())
    }

    #[test]
    fn test_show_sources_truth_table() {
        assert!(show_sources(true, false, false));
        assert!(!show_sources(false, false, false));
        assert!(!show_sources(true, true, false));
        assert!(!show_sources(true, false, true));
        assert!(!show_sources(true, true, true));
    }

    #[test]
    fn test_followup_context_is_prefixed() {
        let instructions = builder().build(&decision(true, "Eat iron-rich food", "en"));
        let context = instructions.context.unwrap();
        assert!(context.starts_with("RECENT CONTEXT"));
        assert!(context.contains("Recent context: Eat iron-rich food"));
        assert!(instructions.language.is_none());
    }

    #[test]
    fn test_independent_context_uses_user_context_block() {
        let instructions = builder().build(&decision(false, "**User Facts:**\n- 5 months", "en"));
        let context = instructions.context.unwrap();
        assert!(context.starts_with("USER CONTEXT"));
        assert!(!context.contains("Recent context:"));
    }

    #[test]
    fn test_empty_context_omits_block() {
        assert_eq!(builder().build(&decision(false, "", "en")), PromptInstructions::default());
    }

    #[test]
    fn test_language_instructions() {
        let locked = builder().build(&decision(true, "x", "hi"));
        assert_eq!(
            locked.language.as_deref(),
            Some("LANGUAGE LOCK: Continue responding in Hindi (same as previous response). DO NOT switch languages.")
        );

        let plain = builder().build(&decision(false, "", "mr"));
        assert_eq!(plain.language.as_deref(), Some("LANGUAGE: Respond in Marathi."));
    }

    #[test]
    fn test_greeting_without_history_drops_language() {
        let mut greeting = decision(false, "", "hi");
        greeting.greeting_without_history = true;
        let instructions = builder().build(&greeting);
        assert!(instructions.language.is_none());
        assert!(instructions.greeting.unwrap().starts_with("GREETING DETECTED"));
    }

    #[test]
    fn test_render_joins_present_blocks() {
        let rendered = builder().build(&decision(false, "facts", "fr")).render();
        assert!(rendered.starts_with("USER CONTEXT"));
        assert!(rendered.ends_with("\n\nLANGUAGE: Respond in French."));
        assert_eq!(PromptInstructions::default().render(), "");
    }
}
