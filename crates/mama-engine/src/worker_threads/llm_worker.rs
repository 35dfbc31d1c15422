//! LLM worker
//!
//! Proxies transcript summarization to an OpenAI-compatible chat completions
//! endpoint (llama-server, vLLM, ...). Calls block until the backend answers;
//! there is no client-side timeout or retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context_engine::summarizer::{summary_prompt, TranscriptSummarizer};
use crate::error::SummarizerError;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

pub struct LLMWorker {
    backend_url: String,
    model: String,
    http_client: reqwest::Client,
}

impl LLMWorker {
    pub fn new(backend_url: impl Into<String>, model: impl Into<String>) -> Self {
        let backend_url = backend_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!("LLM worker initialized with backend: {} (model: {})", backend_url, model);
        Self {
            backend_url,
            model,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.backend_url)
    }

    /// Single non-streaming completion for one user prompt
    pub async fn complete(&self, prompt: String) -> Result<String, SummarizerError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            max_tokens: 512,
            temperature: 0.2,
            stream: false,
        };

        let response = self
            .http_client
            .post(self.completions_url())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizerError::Status { status, body });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SummarizerError::Decode(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .ok_or(SummarizerError::EmptyResponse)
    }
}

#[async_trait]
impl TranscriptSummarizer for LLMWorker {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizerError> {
        debug!("LLM worker summarizing transcript ({} chars)", transcript.chars().count());
        self.complete(summary_prompt(transcript)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_summarize_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJsonString(r#"{"model": "local-llm", "stream": false}"#.to_string()),
                Matcher::Regex("I am 5 months pregnant".to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"**User Facts:**\n- 5 months pregnant"}}]}"#)
            .create_async()
            .await;

        let worker = LLMWorker::new(format!("{}/", server.url()), "local-llm");
        let summary = tokio_test::assert_ok!(worker.summarize("User: I am 5 months pregnant\n\n").await);

        assert_eq!(summary, "**User Facts:**\n- 5 months pregnant");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("model loading")
            .create_async()
            .await;

        let worker = LLMWorker::new(server.url(), "local-llm");
        match worker.summarize("User: hi\n\n").await {
            Err(SummarizerError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "model loading");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let worker = LLMWorker::new(server.url(), "local-llm");
        assert!(matches!(
            worker.summarize("User: hi\n\n").await,
            Err(SummarizerError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_a_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let worker = LLMWorker::new(server.url(), "local-llm");
        assert!(matches!(
            worker.summarize("User: hi\n\n").await,
            Err(SummarizerError::Decode(_))
        ));
    }
}
