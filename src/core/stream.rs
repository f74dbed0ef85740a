//! Server-Sent Events decoding for streamed chat completions.

use crate::domain::model::StreamFragment;
use crate::utils::error::{DesignError, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Splits a byte stream into `data:` payloads. Lines and multi-byte
/// characters may arrive split across network chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<SseEvent>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = Self::parse_line(&line)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Result<Option<SseEvent>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let line = std::mem::take(&mut self.buffer);
        Self::parse_line(&line)
    }

    fn parse_line(raw: &[u8]) -> Result<Option<SseEvent>> {
        let line = std::str::from_utf8(raw).map_err(|e| DesignError::StreamError {
            message: format!("invalid UTF-8 in event stream: {}", e),
        })?;
        let line = line.trim_end_matches(['\r', '\n']);

        let Some(payload) = line.strip_prefix("data:") else {
            // Blank separators, ':' comments, event/id/retry fields.
            return Ok(None);
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if payload.trim() == "[DONE]" {
            return Ok(Some(SseEvent::Done));
        }
        Ok(Some(SseEvent::Data(payload.to_string())))
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ChunkDelta {
    /// Reasoning takes precedence whenever the service sets it.
    pub fn into_fragment(self) -> Option<StreamFragment> {
        match (self.reasoning_content, self.content) {
            (Some(reasoning), _) => Some(StreamFragment::Reasoning(reasoning)),
            (None, Some(content)) if !content.is_empty() => Some(StreamFragment::Answer(content)),
            _ => None,
        }
    }
}

/// Decodes one `data:` payload into at most one fragment.
pub fn parse_chunk(payload: &str) -> Result<Option<StreamFragment>> {
    let chunk: ChatCompletionChunk = serde_json::from_str(payload)?;

    if let Some(error) = chunk.error {
        return Err(DesignError::StreamError {
            message: match error.code {
                Some(code) => format!("{}: {}", code, error.message),
                None => error.message,
            },
        });
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.into_fragment()))
}
