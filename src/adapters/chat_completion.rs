use crate::config::ServiceSettings;
use crate::core::stream::{parse_chunk, SseDecoder, SseEvent};
use crate::core::InferenceService;
use crate::domain::model::{StreamFragment, StreamedAnswer};
use crate::utils::error::{DesignError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint in streaming mode.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    echo_stream: bool,
}

impl std::fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("echo_stream", &self.echo_stream)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionClient {
    /// Fails before any network I/O when no credential is configured.
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| DesignError::MissingConfigError {
                field: "api_key".to_string(),
            })?
            .to_string();

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key,
            echo_stream: settings.echo_stream,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn observe(&self, fragment: &StreamFragment) {
        let text = match fragment {
            StreamFragment::Reasoning(text) | StreamFragment::Answer(text) => text,
        };
        if self.echo_stream {
            let mut stderr = std::io::stderr().lock();
            let _ = stderr.write_all(text.as_bytes());
            let _ = stderr.flush();
        } else {
            tracing::trace!(?fragment, "stream fragment");
        }
    }
}

#[async_trait]
impl InferenceService for ChatCompletionClient {
    async fn stream_completion(&self, prompt: &str) -> Result<StreamedAnswer> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        tracing::debug!("Making streamed completion request to: {}", self.endpoint);
        let mut response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await?;

        tracing::debug!("Inference response status: {}", response.status());
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DesignError::HttpStatusError { status, body });
        }

        let mut decoder = SseDecoder::new();
        let mut accumulated = StreamedAnswer::default();
        let mut done = false;

        'stream: while let Some(bytes) = response.chunk().await? {
            for event in decoder.feed(&bytes)? {
                match event {
                    SseEvent::Done => {
                        done = true;
                        break 'stream;
                    }
                    SseEvent::Data(payload) => {
                        if let Some(fragment) = parse_chunk(&payload)? {
                            self.observe(&fragment);
                            accumulated.push(fragment);
                        }
                    }
                }
            }
        }

        if !done {
            match decoder.finish()? {
                Some(SseEvent::Data(payload)) => {
                    if let Some(fragment) = parse_chunk(&payload)? {
                        self.observe(&fragment);
                        accumulated.push(fragment);
                    }
                }
                Some(SseEvent::Done) => {}
                None => tracing::debug!("Stream closed without a [DONE] marker"),
            }
        }

        if self.echo_stream {
            eprintln!();
        }
        tracing::debug!(
            "Stream complete: {} reasoning chars, {} answer chars",
            accumulated.reasoning.chars().count(),
            accumulated.answer.chars().count()
        );

        Ok(accumulated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings(base_url: String, api_key: Option<&str>) -> ServiceSettings {
        ServiceSettings {
            base_url,
            model: "qwq-32b".to_string(),
            api_key: api_key.map(str::to_string),
            timeout_seconds: 5,
            echo_stream: false,
        }
    }

    fn sse_body(payloads: &[serde_json::Value]) -> String {
        let mut body = String::new();
        for payload in payloads {
            body.push_str(&format!("data: {}\n\n", payload));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let result = ChatCompletionClient::new(&settings("http://localhost".to_string(), None));
        assert!(matches!(
            result,
            Err(DesignError::MissingConfigError { field }) if field == "api_key"
        ));

        let result = ChatCompletionClient::new(&settings("http://localhost".to_string(), Some("  ")));
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let client =
            ChatCompletionClient::new(&settings("https://example.com/v1/".to_string(), Some("k")))
                .unwrap();
        assert_eq!(client.endpoint(), "https://example.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_stream_completion_accumulates_fragments() {
        let server = MockServer::start();
        let body = sse_body(&[
            serde_json::json!({"choices": [{"delta": {"role": "assistant", "content": ""}}]}),
            serde_json::json!({"choices": [{"delta": {"reasoning_content": "Q = 2.5, "}}]}),
            serde_json::json!({"choices": [{"delta": {"reasoning_content": "so R2 = 2.5 R1"}}]}),
            serde_json::json!({"choices": [{"delta": {"content": "R1 = 1000, "}}]}),
            serde_json::json!({"choices": [{"delta": {"content": "R2 = 2500"}}]}),
            serde_json::json!({"choices": [], "usage": {"total_tokens": 10}}),
        ]);

        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{"model": "qwq-32b", "stream": true}"#);
            then.status(200)
                .header("Content-Type", "text/event-stream")
                .body(body);
        });

        let client = ChatCompletionClient::new(&settings(server.base_url(), Some("test-key"))).unwrap();
        let answer = client.stream_completion("design a filter").await.unwrap();

        api_mock.assert();
        assert_eq!(answer.reasoning, "Q = 2.5, so R2 = 2.5 R1");
        assert_eq!(answer.answer, "R1 = 1000, R2 = 2500");
    }

    #[tokio::test]
    async fn test_stream_completion_sends_single_user_message() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .json_body_partial(r#"{"messages": [{"role": "user", "content": "hello"}]}"#);
            then.status(200).body("data: [DONE]\n\n");
        });

        let client = ChatCompletionClient::new(&settings(server.base_url(), Some("k"))).unwrap();
        let answer = client.stream_completion("hello").await.unwrap();

        api_mock.assert();
        assert!(answer.answer.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).body("invalid api key");
        });

        let client = ChatCompletionClient::new(&settings(server.base_url(), Some("bad"))).unwrap();
        let result = client.stream_completion("prompt").await;

        api_mock.assert();
        assert!(matches!(
            result,
            Err(DesignError::HttpStatusError { status: 401, body }) if body == "invalid api key"
        ));
    }

    #[tokio::test]
    async fn test_error_chunk_aborts_stream() {
        let server = MockServer::start();
        let body = sse_body(&[
            serde_json::json!({"choices": [{"delta": {"content": "R1 = "}}]}),
            serde_json::json!({"error": {"code": "DataInspectionFailed", "message": "blocked"}}),
        ]);
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).body(body);
        });

        let client = ChatCompletionClient::new(&settings(server.base_url(), Some("k"))).unwrap();
        let result = client.stream_completion("prompt").await;

        assert!(matches!(result, Err(DesignError::StreamError { .. })));
    }
}
