//! Server-sent event decoding for `streamGenerateContent?alt=sse`.
//!
//! Each event carries one `GenerateContentResponse` JSON object on its `data:`
//! line(s). Only the candidate text parts matter here; everything else is
//! ignored.

use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::error::ChatError;

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// Turn an HTTP body into a stream of non-empty text fragments, in order.
pub fn decode_fragments<S, E>(byte_stream: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let byte_stream = Box::pin(byte_stream.map(|result| {
        result.map_err(|e| ChatError::Connection(format!("error in HTTP stream: {e}")))
    }));

    Box::pin(stream::unfold(
        (byte_stream, Vec::<u8>::new(), false),
        |(mut byte_stream, mut buffer, mut done)| async move {
            loop {
                if done {
                    return None;
                }

                // Drain complete events already buffered.
                while let Some(event) = take_event(&mut buffer) {
                    if let Some(item) = parse_event(&event) {
                        return Some((item, (byte_stream, buffer, done)));
                    }
                }

                match byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.extend(bytes.iter().copied().filter(|&b| b != b'\r'));
                    },
                    Some(Err(e)) => {
                        done = true;
                        return Some((Err(e), (byte_stream, buffer, done)));
                    },
                    None => {
                        done = true;
                        // A final event without a trailing blank line.
                        let rest = std::mem::take(&mut buffer);
                        if let Some(item) = parse_event(&rest) {
                            return Some((item, (byte_stream, buffer, done)));
                        }
                        return None;
                    },
                }
            }
        },
    ))
}

/// Split one blank-line-terminated event off the front of the buffer.
fn take_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|w| w == b"\n\n")?;
    let event: Vec<u8> = buffer.drain(..end + 2).take(end).collect();
    Some(event)
}

/// Parse one SSE event. `None` for events that carry no text.
fn parse_event(event: &[u8]) -> Option<Result<String, ChatError>> {
    let text = match std::str::from_utf8(event) {
        Ok(t) => t,
        Err(e) => return Some(Err(ChatError::Decode(format!("invalid UTF-8 in stream: {e}")))),
    };

    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data.is_empty() {
        return None;
    }
    let data = data.join("\n");
    if data.trim() == "[DONE]" {
        return None;
    }

    let response: GenerateContentResponse = match serde_json::from_str(&data) {
        Ok(r) => r,
        Err(e) => {
            return Some(Err(ChatError::Decode(format!(
                "failed to parse event JSON: {e}"
            ))));
        },
    };
    if let Some(err) = response.error {
        return Some(Err(ChatError::Api(err.message)));
    }

    let fragment: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if fragment.is_empty() {
        None
    } else {
        Some(Ok(fragment))
    }
}
