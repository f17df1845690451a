use anyhow::{Result, anyhow, bail};
use serde::Deserialize;

/// Largest partial event kept while waiting for its blank-line terminator.
pub const MAX_PENDING_EVENT_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<StreamError>,
}

/// Incremental decoder for `streamGenerateContent?alt=sse` bodies. Bytes may arrive
/// split anywhere, including inside a UTF-8 sequence; only complete events are decoded.
#[derive(Debug, Default)]
pub struct SseTextDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to hold no event boundary.
    scanned: usize,
}

impl SseTextDecoder {
    /// Feeds one network chunk and returns the text of every event it completed.
    /// Fails once a single event grows past [`MAX_PENDING_EVENT_BYTES`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Result<String>>> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut texts = Vec::new();
        while let Some(end) = find_event_end(&self.buffer, self.scanned) {
            let event: Vec<u8> = self.buffer.drain(..end + 2).collect();
            self.scanned = 0;
            if let Some(text) = decode_event(&event[..end]) {
                texts.push(text);
            }
        }
        // A boundary may straddle the next chunk, so the last byte is rescanned.
        self.scanned = self.buffer.len().saturating_sub(1);

        if self.buffer.len() > MAX_PENDING_EVENT_BYTES {
            let pending = self.buffer.len();
            self.buffer = Vec::new();
            self.scanned = 0;
            bail!("model stream event exceeds {MAX_PENDING_EVENT_BYTES} bytes ({pending} pending)");
        }

        Ok(texts)
    }

    /// Decodes whatever is left when the body ends without a trailing blank line.
    pub fn finish(&mut self) -> Vec<Result<String>> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        decode_event(&rest).into_iter().collect()
    }
}

fn find_event_end(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|pair| pair == b"\n\n")
        .map(|offset| from + offset)
}

fn decode_event(event: &[u8]) -> Option<Result<String>> {
    let event = match std::str::from_utf8(event) {
        Ok(event) => event,
        Err(err) => return Some(Err(anyhow!("model stream is not valid utf-8: {err}"))),
    };

    let data = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect::<Vec<_>>()
        .join("\n");

    if data.trim().is_empty() || data.trim() == "[DONE]" {
        return None;
    }

    let chunk: GenerateContentChunk = match serde_json::from_str(&data) {
        Ok(chunk) => chunk,
        Err(err) => return Some(Err(anyhow!("unreadable model stream event: {err}"))),
    };

    if let Some(error) = chunk.error {
        return Some(Err(anyhow!(
            "model stream error {}: {}",
            error.status.unwrap_or_default(),
            error.message.unwrap_or_default()
        )));
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.text)
        .collect();

    (!text.is_empty()).then_some(Ok(text))
}
