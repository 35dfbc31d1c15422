//! Language codes, detection and the response-language rules.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ContextError;
use crate::memory::{last_assistant_turn, ConversationTurn};
use crate::utils::TextUtils;

/// Languages the assistant answers in, with display names used in prompts
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("mr", "Marathi"),
    ("hi", "Hindi"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("ml", "Malayalam"),
    ("gu", "Gujarati"),
    ("or", "Odia"),
    ("bn", "Bengali"),
    ("pa", "Punjabi"),
    ("kn", "Kannada"),
    ("as", "Assamese"),
    ("ur", "Urdu"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
];

/// Phrases that explicitly ask for an English answer
const ENGLISH_REQUEST_PHRASES: &[&str] = &[
    "give in english",
    "translate to english",
    "in english",
    "english mein",
];

/// Lowercase ISO 639 language code ("en", "hi", "ind")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Accepts "en", "EN", "en-US" and "pt_BR" (region dropped); rejects
    /// anything that is not 2-3 ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, ContextError> {
        let primary = raw
            .trim()
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_lowercase()) {
            Ok(Self(primary))
        } else {
            Err(ContextError::InvalidLanguage(raw.to_string()))
        }
    }

    /// For compile-time constants already in canonical form
    pub(crate) fn from_static(code: &'static str) -> Self {
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name for supported languages, the bare code otherwise
    pub fn display_name(&self) -> &str {
        SUPPORTED_LANGUAGES
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
            .unwrap_or(self.0.as_str())
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_LANGUAGES.iter().any(|(code, _)| *code == self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageCode {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Detects the language of a piece of text. `None` means undetermined.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Option<LanguageCode>;
}

/// Trigram/script based detection backed by `whatlang`
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<LanguageCode> {
        use whatlang::Lang;

        let info = whatlang::detect(text)?;
        let code = match info.lang() {
            Lang::Mar => "mr",
            Lang::Hin => "hi",
            Lang::Tam => "ta",
            Lang::Tel => "te",
            Lang::Mal => "ml",
            Lang::Guj => "gu",
            Lang::Ori => "or",
            Lang::Ben => "bn",
            Lang::Pan => "pa",
            Lang::Kan => "kn",
            Lang::Urd => "ur",
            Lang::Eng => "en",
            Lang::Spa => "es",
            Lang::Fra => "fr",
            Lang::Deu => "de",
            Lang::Ind => "id",
            other => other.code(),
        };
        debug!("Detected language {} (confidence {:.2})", code, info.confidence());
        LanguageCode::parse(code).ok()
    }
}

/// How follow-ups pick their answer language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePolicy {
    /// A follow-up typed in the default language keeps the language of the
    /// previous answer.
    #[default]
    LockOnFollowup,
    /// Always answer in the language requested for the current query;
    /// history never influences the choice.
    CurrentQuery,
}

impl FromStr for LanguagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lock" | "lock_on_followup" => Ok(LanguagePolicy::LockOnFollowup),
            "current_query" | "override" => Ok(LanguagePolicy::CurrentQuery),
            other => Err(format!(
                "unknown language policy {:?}, expected \"lock\" or \"current_query\"",
                other
            )),
        }
    }
}

/// Facts the resolution rule needs about the current query
#[derive(Debug, Clone, Copy)]
pub struct LanguageInputs<'a> {
    pub target: &'a LanguageCode,
    pub is_followup: bool,
    pub is_greeting: bool,
    pub has_history: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageResolution {
    pub language: LanguageCode,
    /// Kept from the previous answer rather than the request
    pub locked: bool,
    /// Greeting with no prior conversation
    pub greeting_default: bool,
}

pub struct LanguageResolver {
    default_language: LanguageCode,
    blocked_language: LanguageCode,
    policy: LanguagePolicy,
    sample_chars: usize,
    detector: Arc<dyn LanguageDetector>,
}

impl LanguageResolver {
    pub fn new(
        default_language: LanguageCode,
        blocked_language: LanguageCode,
        policy: LanguagePolicy,
        sample_chars: usize,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            default_language,
            blocked_language,
            policy,
            sample_chars,
            detector,
        }
    }

    pub fn default_language(&self) -> &LanguageCode {
        &self.default_language
    }

    pub fn policy(&self) -> LanguagePolicy {
        self.policy
    }

    /// Language of the most recent assistant turn, judged on its first
    /// `sample_chars` characters
    pub fn last_response_language(&self, history: &[ConversationTurn]) -> Option<LanguageCode> {
        let turn = last_assistant_turn(history)?;
        let sample = TextUtils::take_chars(&turn.content, self.sample_chars);
        self.detector.detect(sample)
    }

    /// Language a query asks to be answered in.
    ///
    /// An explicit English request is stripped from the query and wins over
    /// detection; otherwise the query's detected language is used, falling
    /// back to the default when undetermined.
    pub fn requested_language(&self, query: &str) -> (String, LanguageCode) {
        let lowered = query.to_lowercase();
        if ENGLISH_REQUEST_PHRASES.iter().any(|p| lowered.contains(p)) {
            let mut cleaned = lowered;
            for phrase in ENGLISH_REQUEST_PHRASES {
                cleaned = cleaned.replace(phrase, "");
            }
            info!("🔄 User requested an English response");
            let english = LanguageCode::from_static("en");
            return (TextUtils::normalize_whitespace(cleaned.trim()).into_owned(), english);
        }

        let language = self
            .detector
            .detect(query)
            .unwrap_or_else(|| self.default_language.clone());
        (query.to_string(), language)
    }

    /// Whether a code may ever be used as the response language
    pub fn is_eligible(&self, code: &LanguageCode) -> bool {
        *code != self.blocked_language && code.is_supported()
    }

    /// Apply the lock rule, the greeting exception and the eligibility check,
    /// in that order.
    pub fn resolve(&self, inputs: LanguageInputs<'_>, history: &[ConversationTurn]) -> LanguageResolution {
        let mut language = inputs.target.clone();
        let mut locked = false;

        if self.policy == LanguagePolicy::LockOnFollowup
            && inputs.is_followup
            && *inputs.target == self.default_language
        {
            match self.last_response_language(history) {
                Some(previous) => {
                    if previous != language {
                        info!("🔒 Language locked to previous response: {}", previous);
                        locked = true;
                    }
                    language = previous;
                }
                None => debug!("Last response language undetermined, keeping {}", language),
            }
        }

        let greeting_default = inputs.is_greeting && !inputs.has_history;
        if greeting_default {
            language = self.default_language.clone();
            locked = false;
        }

        if !self.is_eligible(&language) {
            warn!(
                "Language {} is not eligible for responses, falling back to {}",
                language, self.default_language
            );
            language = self.default_language.clone();
            locked = false;
        }

        LanguageResolution {
            language,
            locked,
            greeting_default,
        }
    }

    /// Language to use when the normal decision could not be computed
    pub fn fallback_language(&self, raw_target: &str) -> LanguageCode {
        LanguageCode::parse(raw_target)
            .ok()
            .filter(|code| self.is_eligible(code))
            .unwrap_or_else(|| self.default_language.clone())
    }
}
