//! Incremental Server-Sent Events framing.

/// One dispatched SSE message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseMessage {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

/// Accumulates body chunks and splits them into messages.
///
/// Works on bytes so a multi-byte character split across two chunks is
/// decoded intact.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every message it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        // CRLF line endings are folded to LF.
        self.buf.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut messages = Vec::new();
        while let Some(pos) = find_block_end(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..pos + 2).collect();
            if let Some(msg) = parse_block(&String::from_utf8_lossy(&block[..pos])) {
                messages.push(msg);
            }
        }
        messages
    }

    /// Bytes received but not yet terminated by a blank line.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn find_block_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn parse_block(block: &str) -> Option<SseMessage> {
    let mut msg = SseMessage::default();
    let mut data: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => data.push(value),
            "id" => msg.id = Some(value.to_string()),
            "event" => msg.event = Some(value.to_string()),
            _ => {},
        }
    }

    if data.is_empty() {
        return None;
    }
    msg.data = data.join("\n");
    Some(msg)
}
