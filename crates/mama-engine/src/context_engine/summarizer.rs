//! Contract of the external "summarize transcript to facts + topic" capability

use async_trait::async_trait;

use crate::error::SummarizerError;

/// Turns a role-labelled transcript into an itemized list of facts the user
/// stated about themselves plus the most recent topic.
#[async_trait]
pub trait TranscriptSummarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizerError>;
}

/// Prompt sent to a text-generation backend for [`TranscriptSummarizer`]
pub fn summary_prompt(transcript: &str) -> String {
    format!(
        r#"You are a MEDICAL CONVERSATION CONTEXT EXTRACTOR.

Your task: extract ALL relevant USER FACTS and the MOST RECENT medical topic.

RULES:
1. USER FACTS: any information the user shared about themselves, such as
   pregnancy month, trimester or week, symptoms, medical conditions and
   previous medical history.
2. RECENT TOPIC: the medical topic discussed most recently.
3. RECENCY: if a fact appears more than once, keep the most recent version.
4. COMPLETENESS: include every relevant fact, not just one.
5. NO SPECULATION: use only what the user explicitly stated.

Conversation History:
{transcript}
OUTPUT FORMAT:
**User Facts:**
- [each fact the user shared about themselves]

**Recent Topic:**
- [the medical topic being discussed]

Context:
"#
    )
}
