//! Context engine - decides what history and language go downstream with a query

pub mod context_builder;
pub mod followup_classifier;
pub mod history_selector;
pub mod language;
pub mod orchestrator;
pub mod summarizer;

pub use context_builder::{show_sources, ContextBuilder, ContextDecision, PromptInstructions};
pub use followup_classifier::{FollowupClassifier, FollowupRule};
pub use history_selector::{HistorySelector, NO_RECENT_INFORMATION, NO_RECENT_TOPIC};
pub use language::{
    LanguageCode, LanguageDetector, LanguagePolicy, LanguageResolver, WhatlangDetector, SUPPORTED_LANGUAGES,
};
pub use orchestrator::{ContextSelector, SelectionRequest, SelectorConfig};
pub use summarizer::{summary_prompt, TranscriptSummarizer};
