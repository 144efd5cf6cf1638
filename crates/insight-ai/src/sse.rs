//! Server-sent-event decoding for streamed provider responses.
//!
//! Providers stream their answers as `data: <json>` lines. [`SseDecoder`]
//! buffers raw bytes, hands out only complete lines and keeps the trailing
//! partial line for the next chunk. [`StreamFormat`] then pulls the text
//! delta out of each payload. Payloads that are not valid JSON or carry no
//! text are skipped.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::{AiError, Result};

/// A stream of text tokens.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Payload that terminates an OpenAI-style stream.
const DONE: &str = "[DONE]";

/// One decoded SSE data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseData {
    /// A `data: ` payload.
    Payload(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental line splitter for an SSE byte stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `[DONE]` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a chunk and return the data lines it completed.
    ///
    /// Nothing is returned after `[DONE]`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseData> {
        if self.done {
            return Vec::new();
        }
        self.buffer.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            if data.trim() == DONE {
                self.done = true;
                out.push(SseData::Done);
                self.buffer.clear();
                break;
            }
            out.push(SseData::Payload(data.to_string()));
        }
        out
    }

    /// Flush a final unterminated line once the byte stream has ended.
    pub fn finish(&mut self) -> Vec<SseData> {
        if self.done || self.buffer.is_empty() {
            return Vec::new();
        }
        self.buffer.push(b'\n');
        self.push(&[])
    }
}

/// Where a provider puts the text delta in its stream payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// `choices[0].delta.content`
    OpenAi,
    /// `delta.text` of `content_block_delta` events
    Anthropic,
    /// `candidates[0].content.parts[*].text`
    Gemini,
}

impl StreamFormat {
    /// Extract the text delta from one payload.
    pub fn extract(&self, payload: &str) -> Option<String> {
        let json: Value = serde_json::from_str(payload).ok()?;
        let text = match self {
            StreamFormat::OpenAi => json
                .pointer("/choices/0/delta/content")?
                .as_str()?
                .to_string(),
            StreamFormat::Anthropic => {
                if json.get("type")?.as_str()? != "content_block_delta" {
                    return None;
                }
                json.pointer("/delta/text")?.as_str()?.to_string()
            }
            StreamFormat::Gemini => json
                .pointer("/candidates/0/content/parts")?
                .as_array()?
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect(),
        };
        (!text.is_empty()).then_some(text)
    }
}

/// Turn a successful streaming response into a token stream.
///
/// Decoding runs on a spawned task feeding a bounded channel; dropping the
/// returned stream stops it at the next send.
pub fn token_stream(response: reqwest::Response, format: StreamFormat) -> TokenStream {
    let (tx, rx) = mpsc::channel::<Result<String>>(64);

    tokio::spawn(async move {
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tx.send(Err(AiError::Http(e))).await;
                    return;
                }
            };
            if !forward(&tx, decoder.push(&chunk), format).await {
                return;
            }
        }
        forward(&tx, decoder.finish(), format).await;
        debug!("{:?} stream finished", format);
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Send extracted tokens; returns `false` once the stream should stop.
async fn forward(tx: &mpsc::Sender<Result<String>>, lines: Vec<SseData>, format: StreamFormat) -> bool {
    for line in lines {
        match line {
            SseData::Done => return false,
            SseData::Payload(payload) => {
                if let Some(text) = format.extract(&payload)
                    && tx.send(Ok(text)).await.is_err()
                {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_partial_tail() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\":").is_empty());
        let out = decoder.push(b"1}\n\ndata: {\"b\"");
        assert_eq!(out, vec![SseData::Payload("{\"a\":1}".into())]);
        let out = decoder.push(b":2}\r\n");
        assert_eq!(out, vec![SseData::Payload("{\"b\":2}".into())]);
    }

    #[test]
    fn test_ignores_non_data_lines() {
        let mut decoder = SseDecoder::new();
        let out = decoder.push(b"event: message_start\n: comment\nid: 4\ndata: x\n");
        assert_eq!(out, vec![SseData::Payload("x".into())]);
    }

    #[test]
    fn test_done_ends_stream() {
        let mut decoder = SseDecoder::new();
        let out = decoder.push(b"data: a\ndata: [DONE]\ndata: b\n");
        assert_eq!(out, vec![SseData::Payload("a".into()), SseData::Done]);
        assert!(decoder.is_done());
        assert!(decoder.push(b"data: c\n").is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), vec![SseData::Payload("tail".into())]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let line = "data: 70°C\n".as_bytes();
        let (a, b) = line.split_at(9);
        assert!(decoder.push(a).is_empty());
        assert_eq!(decoder.push(b), vec![SseData::Payload("70°C".into())]);
    }

    #[test]
    fn test_extract_openai() {
        let payload = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(StreamFormat::OpenAi.extract(payload).as_deref(), Some("Hello"));
        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(StreamFormat::OpenAi.extract(role_only), None);
    }

    #[test]
    fn test_extract_anthropic() {
        let delta = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        assert_eq!(StreamFormat::Anthropic.extract(delta).as_deref(), Some("Hi"));
        let start = r#"{"type":"message_start","message":{}}"#;
        assert_eq!(StreamFormat::Anthropic.extract(start), None);
    }

    #[test]
    fn test_extract_gemini_joins_parts() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"Pump "},{"text":"is hot"}],"role":"model"}}]}"#;
        assert_eq!(
            StreamFormat::Gemini.extract(payload).as_deref(),
            Some("Pump is hot")
        );
    }

    #[test]
    fn test_extract_ignores_garbage() {
        assert_eq!(StreamFormat::OpenAi.extract("{not json"), None);
        assert_eq!(StreamFormat::Gemini.extract("{}"), None);
    }
}
