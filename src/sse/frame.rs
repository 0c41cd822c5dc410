//! Server-Sent-Events wire format.
//!
//! One frame is a group of `id:`/`event:`/`data:` lines terminated by a
//! blank line. Heartbeats are comment frames (`: text`) which carry no
//! event or data and are invisible to application-level consumers.

use serde_json::Value;

/// One outbound SSE frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub data: String,
    pub event: Option<String>,
    pub id: Option<String>,
}

impl SseFrame {
    /// A data frame with no event name.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            event: None,
            id: None,
        }
    }

    /// A named event frame.
    pub fn event(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            event: Some(event.into()),
            id: None,
        }
    }

    /// A named event frame carrying a JSON payload.
    pub fn json(event: impl Into<String>, value: &Value) -> Self {
        Self::event(event, value.to_string())
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Encode to wire form. Multi-line payloads become one `data:` line
    /// per payload line so the client reassembles them losslessly.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            out.push_str("id: ");
            out.push_str(id);
            out.push('\n');
        }
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }

    /// Encode a comment-only liveness frame.
    pub fn comment(text: &str) -> String {
        format!(": {}\n\n", text)
    }

    /// Decode a single wire frame. Comment lines are ignored, so a
    /// heartbeat decodes to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut frame = SseFrame::default();
        let mut data_lines: Vec<&str> = Vec::new();

        for line in raw.lines() {
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("id:") {
                frame.id = Some(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix("event:") {
                frame.event = Some(rest.trim_start().to_string());
            } else if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
            }
        }

        if data_lines.is_empty() && frame.event.is_none() && frame.id.is_none() {
            return None;
        }
        frame.data = data_lines.join("\n");
        Some(frame)
    }
}
