//! Decides whether a query continues the previous answer.
//!
//! Rules run in a fixed order and the first hit wins, so a continuation
//! phrase always beats the pronoun heuristics.

use serde::Serialize;
use tracing::debug;

use crate::utils::TextUtils;

/// Phrases that only make sense as a continuation
const CONTINUATION_PHRASES: &[&str] = &[
    "tell me more", "explain", "continue", "go on", "elaborate",
    "what about", "and then", "next", "more info", "more information",
    "tell more", "say more", "more details", "expand", "can you explain",
    "explain more", "tell me about it", "about it", "about that",
    "last one", "last question", "previous", "that one",
];

/// References to an item of the previous answer
const ORDINAL_PHRASES: &[&str] = &[
    "first point", "second point", "third point", "fourth point", "fifth point",
    "last point", "next point", "point 1", "point 2", "point 3", "point 4", "point 5",
    "1st point", "2nd point", "3rd point", "4th point", "5th point",
];

/// Pronouns that point back at something already said
const REFERENTIAL_WORDS: &[&str] = &["it", "that", "this", "those", "these", "them"];

/// Pronouns that mark a longer query as referential
const ANAPHORIC_WORDS: &[&str] = &["it", "that", "this"];

/// Openers that introduce a fresh subject even when a pronoun follows
const NEW_TOPIC_PREFIXES: &[&str] = &[
    "what is", "who is", "when is", "where is", "why is", "how is",
];

/// Words at or below which a query counts as short
const SHORT_QUERY_WORDS: usize = 3;

/// Which rule classified a query as a follow-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupRule {
    /// Starts with a continuation/ordinal phrase (raw prefix, so "previously"
    /// counts as "previous")
    ContinuationPhrase,
    /// Three words or fewer containing a referential pronoun
    ShortReferential,
    /// it/that/this next to a space and no new-topic opener
    ReferentialPronoun,
}

#[derive(Debug, Clone, Default)]
pub struct FollowupClassifier;

impl FollowupClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn is_followup(&self, query: &str) -> bool {
        self.classify(query).is_some()
    }

    /// The first matching rule, or `None` for an independent query
    pub fn classify(&self, query: &str) -> Option<FollowupRule> {
        let normalized = TextUtils::normalize_query(query);
        if normalized.is_empty() {
            return None;
        }

        let rule = Self::continuation_phrase(&normalized)
            .or_else(|| Self::short_referential(&normalized))
            .or_else(|| Self::referential_pronoun(&normalized));

        debug!("Follow-up classification for {:?}: {:?}", normalized, rule);
        rule
    }

    fn continuation_phrase(normalized: &str) -> Option<FollowupRule> {
        CONTINUATION_PHRASES
            .iter()
            .chain(ORDINAL_PHRASES)
            .any(|phrase| normalized.starts_with(phrase))
            .then_some(FollowupRule::ContinuationPhrase)
    }

    fn short_referential(normalized: &str) -> Option<FollowupRule> {
        if TextUtils::count_words(normalized) > SHORT_QUERY_WORDS {
            return None;
        }
        TextUtils::word_tokens(normalized)
            .any(|token| REFERENTIAL_WORDS.contains(&token))
            .then_some(FollowupRule::ShortReferential)
    }

    fn referential_pronoun(normalized: &str) -> Option<FollowupRule> {
        let has_pronoun = ANAPHORIC_WORDS
            .iter()
            .any(|word| TextUtils::has_space_adjacent(normalized, word));
        let opens_new_topic = NEW_TOPIC_PREFIXES
            .iter()
            .any(|prefix| normalized.starts_with(prefix));

        (has_pronoun && !opens_new_topic).then_some(FollowupRule::ReferentialPronoun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(query: &str) -> Option<FollowupRule> {
        FollowupClassifier::new().classify(query)
    }

    #[test]
    fn test_reference_examples() {
        let classifier = FollowupClassifier::new();
        assert!(classifier.is_followup("tell me more"));
        assert!(!classifier.is_followup("what is preeclampsia"));
        assert!(classifier.is_followup("is it safe?"));
        assert!(classifier.is_followup("third point"));
    }

    #[test]
    fn test_continuation_phrase_exact_and_prefix() {
        assert_eq!(classify("Continue"), Some(FollowupRule::ContinuationPhrase));
        assert_eq!(classify("  Tell   me more about iron  "), Some(FollowupRule::ContinuationPhrase));
        assert_eq!(classify("point 2 please"), Some(FollowupRule::ContinuationPhrase));
        assert_eq!(classify("elaborate!"), Some(FollowupRule::ContinuationPhrase));
    }

    #[test]
    fn test_phrase_prefix_is_raw() {
        assert_eq!(
            classify("previously diagnosed anemia treatment options"),
            Some(FollowupRule::ContinuationPhrase)
        );
        assert_eq!(classify("explaining nausea causes"), Some(FollowupRule::ContinuationPhrase));
        assert_eq!(classify("nextday delivery options for vitamins"), Some(FollowupRule::ContinuationPhrase));
    }

    #[test]
    fn test_phrase_beats_new_topic_exclusion() {
        // Starts with a continuation phrase; the "what is" exclusion never runs
        assert_eq!(classify("what about what is safe to eat"), Some(FollowupRule::ContinuationPhrase));
    }

    #[test]
    fn test_short_queries_with_pronouns() {
        assert_eq!(classify("why that?"), Some(FollowupRule::ShortReferential));
        assert_eq!(classify("what is that"), Some(FollowupRule::ShortReferential));
        assert_eq!(classify("those ones"), Some(FollowupRule::ShortReferential));
        assert_eq!(classify("iron supplements dosage"), None);
    }

    #[test]
    fn test_long_referential_queries() {
        assert_eq!(
            classify("should I take it before or after meals"),
            Some(FollowupRule::ReferentialPronoun)
        );
        assert_eq!(classify("what is this rash on my belly during pregnancy"), None);
        assert_eq!(classify("how is that different from gestational diabetes"), None);
    }

    #[test]
    fn test_pronoun_fragments_next_to_spaces_count() {
        assert_eq!(
            classify("which items should be in my hospital bag"),
            Some(FollowupRule::ReferentialPronoun)
        );
        assert_eq!(
            classify("is there a caffeine limit during pregnancy"),
            Some(FollowupRule::ReferentialPronoun)
        );
        assert_eq!(classify("how much folic acid do vitamins contain"), None);
    }

    #[test]
    fn test_long_these_those_are_not_referential() {
        assert_eq!(classify("are these exercises fine in the third trimester"), None);
    }

    #[test]
    fn test_independent_and_empty_queries() {
        assert_eq!(classify("how much folic acid should I take daily"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("   "), None);
    }

    proptest! {
        #[test]
        fn prop_continuation_prefix_always_wins(
            idx in 0usize..CONTINUATION_PHRASES.len(),
            tail in "( [a-z]{1,8}){0,6}",
        ) {
            let query = format!("{}{}", CONTINUATION_PHRASES[idx], tail);
            prop_assert_eq!(classify(&query), Some(FollowupRule::ContinuationPhrase));
        }
    }
}
