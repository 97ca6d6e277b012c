//! Incremental parser for the server's text event stream.
//!
//! Chunks arrive at arbitrary byte boundaries, so the parser buffers
//! partial lines across calls. Events are terminated by a blank line;
//! `data:` lines carry the payload, comment lines (keep-alives) and
//! `event:`/`id:` fields are skipped.

use loopline_entity::message::MessageWithSender;

/// Stateful event-stream parser.
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: String,
    data: Vec<String>,
}

impl EventParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every message completed by
    /// it. Payloads that fail to parse are logged and dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<MessageWithSender> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut messages = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(message) = self.take_event() {
                    messages.push(message);
                }
            } else if let Some(payload) = line.strip_prefix("data:") {
                self.data.push(payload.trim_start().to_string());
            }
            // Comments (":keep-alive") and other fields carry nothing
            // the client needs.
        }
        messages
    }

    fn take_event(&mut self) -> Option<MessageWithSender> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();

        match serde_json::from_str(&payload) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unparseable event payload");
                None
            }
        }
    }
}
