//! Context selector
//!
//! Runs one query through classification, context selection and language
//! resolution, and degrades to a no-context decision when any stage fails.

use std::sync::Arc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::context_engine::{
    context_builder::{show_sources, ContextBuilder, ContextDecision, PromptInstructions},
    followup_classifier::FollowupClassifier,
    history_selector::HistorySelector,
    language::{LanguageCode, LanguageDetector, LanguageInputs, LanguagePolicy, LanguageResolver, WhatlangDetector},
    summarizer::TranscriptSummarizer,
};
use crate::error::ContextError;
use crate::memory::{valid_turns, ConversationTurn};

/// Tunables of the context selector
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub default_language: LanguageCode,
    /// Never used as a response language
    pub blocked_language: LanguageCode,
    pub language_policy: LanguagePolicy,
    pub followup_context_chars: usize,
    pub history_window_turns: usize,
    pub language_sample_chars: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            default_language: LanguageCode::from_static("en"),
            blocked_language: LanguageCode::from_static("id"),
            language_policy: LanguagePolicy::LockOnFollowup,
            followup_context_chars: 300,
            history_window_turns: 10,
            language_sample_chars: 100,
        }
    }
}

/// Everything the selector needs for one query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionRequest {
    pub query: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// Requested response language; derived from the query when absent
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub is_greeting: bool,
    #[serde(default)]
    pub is_non_informational: bool,
    #[serde(default)]
    pub has_retrieved_passages: bool,
}

/// Progress of a single selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStage {
    Start,
    Classified,
    ContextSelected,
    LanguageResolved,
    Done,
}

/// Turns (query, history) into a [`ContextDecision`].
///
/// Holds no per-request state, so one instance serves concurrent requests.
pub struct ContextSelector {
    config: SelectorConfig,
    classifier: FollowupClassifier,
    history: HistorySelector,
    language: LanguageResolver,
    builder: ContextBuilder,
}

impl ContextSelector {
    pub fn new(config: SelectorConfig, summarizer: Arc<dyn TranscriptSummarizer>) -> Self {
        Self::with_detector(config, summarizer, Arc::new(WhatlangDetector))
    }

    pub fn with_detector(
        config: SelectorConfig,
        summarizer: Arc<dyn TranscriptSummarizer>,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        let history = HistorySelector::new(
            config.followup_context_chars,
            config.history_window_turns,
            summarizer,
        );
        let language = LanguageResolver::new(
            config.default_language.clone(),
            config.blocked_language.clone(),
            config.language_policy,
            config.language_sample_chars,
            detector,
        );
        let builder = ContextBuilder::new(config.default_language.clone());

        info!(
            "Context selector initialized (default: {}, blocked: {}, policy: {:?})",
            config.default_language, config.blocked_language, config.language_policy
        );

        Self {
            config,
            classifier: FollowupClassifier::new(),
            history,
            language,
            builder,
        }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Cleaned query and the language it asks to be answered in
    pub fn requested_language(&self, query: &str) -> (String, LanguageCode) {
        self.language.requested_language(query)
    }

    pub fn instructions(&self, decision: &ContextDecision) -> PromptInstructions {
        self.builder.build(decision)
    }

    /// Never fails: internal errors degrade to "not a follow-up, requested
    /// language, no context".
    pub async fn select(&self, request: &SelectionRequest) -> ContextDecision {
        let mut stage = SelectionStage::Start;
        match self.run_stages(request, &mut stage).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Context selection failed after {:?}, using safe default: {}", stage, e);
                self.fallback_decision(request)
            }
        }
    }

    pub async fn try_select(&self, request: &SelectionRequest) -> Result<ContextDecision, ContextError> {
        let mut stage = SelectionStage::Start;
        self.run_stages(request, &mut stage).await
    }

    async fn run_stages(
        &self,
        request: &SelectionRequest,
        stage: &mut SelectionStage,
    ) -> Result<ContextDecision, ContextError> {
        if request.query.trim().is_empty() {
            return Err(ContextError::EmptyQuery);
        }
        let target = match request.target_language.as_deref() {
            Some(raw) => LanguageCode::parse(raw)?,
            None => self.derived_target(&request.query),
        };

        let followup_rule = self.classifier.classify(&request.query);
        let is_followup = followup_rule.is_some();
        Self::advance(stage, SelectionStage::Classified);

        // Greetings never carry history context
        let selected_context = if request.is_greeting {
            String::new()
        } else {
            self.history.select(&request.history, is_followup).await?
        };
        Self::advance(stage, SelectionStage::ContextSelected);

        let has_history = valid_turns(&request.history).next().is_some();
        let resolution = self.language.resolve(
            LanguageInputs {
                target: &target,
                is_followup,
                is_greeting: request.is_greeting,
                has_history,
            },
            &request.history,
        );
        Self::advance(stage, SelectionStage::LanguageResolved);

        let decision = ContextDecision {
            is_followup,
            selected_context,
            resolved_language: resolution.language,
            show_sources: show_sources(
                request.has_retrieved_passages,
                request.is_greeting,
                request.is_non_informational,
            ),
            language_locked: resolution.locked,
            greeting_without_history: resolution.greeting_default,
            degraded: false,
            followup_rule,
        };
        Self::advance(stage, SelectionStage::Done);

        info!(
            "🔍 Context decision: followup={}, language={}, context={} chars, sources={}",
            decision.is_followup,
            decision.resolved_language,
            decision.selected_context.chars().count(),
            decision.show_sources
        );
        Ok(decision)
    }

    fn advance(stage: &mut SelectionStage, next: SelectionStage) {
        debug!("Selection stage {:?} -> {:?}", stage, next);
        *stage = next;
    }

    fn derived_target(&self, query: &str) -> LanguageCode {
        self.language.requested_language(query).1
    }

    fn fallback_decision(&self, request: &SelectionRequest) -> ContextDecision {
        let language = match request.target_language.as_deref() {
            Some(raw) => self.language.fallback_language(raw),
            None => self.language.fallback_language(self.derived_target(&request.query).as_str()),
        };
        ContextDecision {
            is_followup: false,
            selected_context: String::new(),
            resolved_language: language,
            show_sources: show_sources(
                request.has_retrieved_passages,
                request.is_greeting,
                request.is_non_informational,
            ),
            language_locked: false,
            greeting_without_history: false,
            degraded: true,
            followup_rule: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_engine::history_selector::NO_RECENT_INFORMATION;
    use crate::context_engine::test_support::{FixedDetector, ScriptedSummarizer};
    use crate::context_engine::FollowupRule;

    fn selector(detector: FixedDetector, summarizer: ScriptedSummarizer) -> ContextSelector {
        ContextSelector::with_detector(SelectorConfig::default(), Arc::new(summarizer), Arc::new(detector))
    }

    fn request(query: &str, history: Vec<ConversationTurn>, target: &str) -> SelectionRequest {
        SelectionRequest {
            query: query.to_string(),
            history,
            target_language: Some(target.to_string()),
            ..Default::default()
        }
    }

    fn hindi_history() -> Vec<ConversationTurn> {
        vec![
            ConversationTurn::user("mujhe ulti ho rahi hai"),
            ConversationTurn::assistant("गर्भावस्था में मतली आम है। अदरक की चाय और थोड़ा-थोड़ा खाना मदद करता है।"),
        ]
    }

    #[tokio::test]
    async fn test_followup_in_english_locks_to_hindi() {
        let selector = selector(FixedDetector::always("hi"), ScriptedSummarizer::replying("unused"));
        let decision = selector.select(&request("tell me more", hindi_history(), "en")).await;

        assert!(decision.is_followup);
        assert_eq!(decision.followup_rule, Some(FollowupRule::ContinuationPhrase));
        assert_eq!(decision.resolved_language.as_str(), "hi");
        assert!(decision.language_locked);
        assert!(decision.selected_context.starts_with("गर्भावस्था"));
        assert!(!decision.degraded);
    }

    #[tokio::test]
    async fn test_followup_with_explicit_french_is_not_locked() {
        let selector = selector(FixedDetector::always("hi"), ScriptedSummarizer::replying("unused"));
        let decision = selector.select(&request("tell me more", hindi_history(), "fr")).await;
        assert_eq!(decision.resolved_language.as_str(), "fr");
        assert!(!decision.language_locked);
    }

    #[tokio::test]
    async fn test_followup_excerpt_is_truncated() {
        let selector = selector(FixedDetector::undetermined(), ScriptedSummarizer::replying("unused"));
        let history = vec![ConversationTurn::assistant("A".repeat(400))];
        let decision = selector.select(&request("third point", history, "en")).await;
        assert_eq!(decision.selected_context, format!("{}...", "A".repeat(300)));
    }

    #[tokio::test]
    async fn test_followup_without_answer_gets_marker() {
        let selector = selector(FixedDetector::undetermined(), ScriptedSummarizer::replying("unused"));
        let history = vec![ConversationTurn::user("hello")];
        let decision = selector.select(&request("is it safe?", history, "en")).await;
        assert!(decision.is_followup);
        assert_eq!(decision.selected_context, NO_RECENT_INFORMATION);
    }

    #[tokio::test]
    async fn test_independent_query_uses_summary() {
        let summarizer = ScriptedSummarizer::replying("**User Facts:**\n- 5 months pregnant");
        let calls = summarizer.calls();
        let selector = selector(FixedDetector::always("hi"), summarizer);

        let decision = selector
            .select(&request("what is preeclampsia", hindi_history(), "en"))
            .await;
        assert!(!decision.is_followup);
        assert_eq!(decision.selected_context, "**User Facts:**\n- 5 months pregnant");
        assert_eq!(decision.resolved_language.as_str(), "en");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_greeting_with_empty_history_forces_default() {
        let selector = selector(FixedDetector::always("hi"), ScriptedSummarizer::replying("unused"));
        let mut greeting = request("namaste", Vec::new(), "hi");
        greeting.is_greeting = true;
        greeting.has_retrieved_passages = true;

        let decision = selector.select(&greeting).await;
        assert_eq!(decision.resolved_language.as_str(), "en");
        assert!(decision.greeting_without_history);
        assert!(!decision.show_sources);
        assert_eq!(decision.selected_context, "");

        let instructions = selector.instructions(&decision);
        assert!(instructions.greeting.is_some());
        assert!(instructions.language.is_none());
    }

    #[tokio::test]
    async fn test_show_sources_follows_inputs() {
        let selector = selector(FixedDetector::undetermined(), ScriptedSummarizer::replying("facts"));
        let mut informational = request("how much iron do I need", Vec::new(), "en");
        informational.has_retrieved_passages = true;
        assert!(selector.select(&informational).await.show_sources);

        informational.is_non_informational = true;
        assert!(!selector.select(&informational).await.show_sources);
    }

    #[tokio::test]
    async fn test_summarizer_failure_falls_back() {
        let selector = selector(FixedDetector::always("hi"), ScriptedSummarizer::failing());
        let mut query = request("what is preeclampsia", hindi_history(), "ta");
        query.has_retrieved_passages = true;

        let decision = selector.select(&query).await;
        assert!(decision.degraded);
        assert!(!decision.is_followup);
        assert_eq!(decision.selected_context, "");
        assert_eq!(decision.resolved_language.as_str(), "ta");
        assert!(decision.show_sources);
        assert!(selector.try_select(&query).await.is_err());
    }

    #[tokio::test]
    async fn test_summarizer_failure_keeps_derived_language() {
        let selector = selector(FixedDetector::always("hi"), ScriptedSummarizer::failing());
        let decision = selector
            .select(&SelectionRequest {
                query: "गर्भावस्था में आयरन कितना चाहिए".to_string(),
                history: hindi_history(),
                ..Default::default()
            })
            .await;

        assert!(decision.degraded);
        assert_eq!(decision.selected_context, "");
        assert_eq!(decision.resolved_language.as_str(), "hi");
    }

    #[tokio::test]
    async fn test_failed_selection_reports_last_stage() {
        let selector = selector(FixedDetector::always("hi"), ScriptedSummarizer::failing());
        let query = request("what is preeclampsia", hindi_history(), "en");

        let mut stage = SelectionStage::Start;
        assert!(selector.run_stages(&query, &mut stage).await.is_err());
        assert_eq!(stage, SelectionStage::Classified);

        let mut stage = SelectionStage::Start;
        assert!(selector.run_stages(&request("   ", Vec::new(), "en"), &mut stage).await.is_err());
        assert_eq!(stage, SelectionStage::Start);
    }

    #[tokio::test]
    async fn test_greeting_with_history_skips_summarizer() {
        let summarizer = ScriptedSummarizer::failing();
        let calls = summarizer.calls();
        let selector = selector(FixedDetector::always("hi"), summarizer);
        let mut greeting = request("namaste", hindi_history(), "hi");
        greeting.is_greeting = true;

        let decision = selector.select(&greeting).await;
        assert!(!decision.degraded);
        assert_eq!(decision.selected_context, "");
        assert_eq!(decision.resolved_language.as_str(), "hi");
        assert!(!decision.greeting_without_history);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_or_blocked_target_falls_back_to_default() {
        let selector = selector(FixedDetector::undetermined(), ScriptedSummarizer::replying("unused"));

        let garbage = selector.select(&request("what is anemia", Vec::new(), "not a language")).await;
        assert!(garbage.degraded);
        assert_eq!(garbage.resolved_language.as_str(), "en");

        let blocked = selector.select(&request("what is anemia", Vec::new(), "id")).await;
        assert!(!blocked.degraded);
        assert_eq!(blocked.resolved_language.as_str(), "en");
    }

    #[tokio::test]
    async fn test_empty_query_degrades() {
        let selector = selector(FixedDetector::undetermined(), ScriptedSummarizer::replying("unused"));
        let decision = selector.select(&request("   ", hindi_history(), "en")).await;
        assert!(decision.degraded);
        assert!(!decision.is_followup);
    }

    #[tokio::test]
    async fn test_missing_target_is_derived_from_query() {
        let selector = selector(FixedDetector::always("mr"), ScriptedSummarizer::replying("unused"));
        let decision = selector
            .select(&SelectionRequest {
                query: "मला काय खावे?".to_string(),
                ..Default::default()
            })
            .await;
        assert_eq!(decision.resolved_language.as_str(), "mr");
    }

    #[tokio::test]
    async fn test_current_query_policy_ignores_history_language() {
        let config = SelectorConfig {
            language_policy: LanguagePolicy::CurrentQuery,
            ..Default::default()
        };
        let selector = ContextSelector::with_detector(
            config,
            Arc::new(ScriptedSummarizer::replying("unused")),
            Arc::new(FixedDetector::always("hi")),
        );
        let decision = selector.select(&request("tell me more", hindi_history(), "en")).await;
        assert!(decision.is_followup);
        assert_eq!(decision.resolved_language.as_str(), "en");
    }

    #[tokio::test]
    async fn test_malformed_history_entries_are_skipped() {
        let selector = selector(FixedDetector::undetermined(), ScriptedSummarizer::replying("unused"));
        let history = vec![
            ConversationTurn::assistant("Folic acid daily"),
            ConversationTurn { role: String::new(), content: "broken".into() },
        ];
        let decision = selector.select(&request("tell me more", history, "en")).await;
        assert!(!decision.degraded);
        assert_eq!(decision.selected_context, "Folic acid daily");
    }
}
