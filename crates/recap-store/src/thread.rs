use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::write_atomic;

/// Message-ID chain that threads consecutive report emails together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl ThreadState {
    /// Load from `thread.json`. A missing or unreadable file starts a new thread.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable thread state");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(path, json.as_bytes())
    }

    /// `In-Reply-To` for the next message.
    pub fn in_reply_to(&self) -> Option<&str> {
        self.last_message_id.as_deref()
    }

    /// `References` for the next message, space separated.
    pub fn references_header(&self) -> Option<String> {
        (!self.references.is_empty()).then(|| self.references.join(" "))
    }

    /// Record a message that was just sent.
    pub fn record_sent(&mut self, message_id: &str) {
        if !self.references.iter().any(|r| r == message_id) {
            self.references.push(message_id.to_string());
        }
        self.last_message_id = Some(message_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_thread_has_no_headers() {
        let state = ThreadState::default();
        assert_eq!(state.in_reply_to(), None);
        assert_eq!(state.references_header(), None);
    }

    #[test]
    fn chain_accumulates_across_sends() {
        let mut state = ThreadState::default();
        state.record_sent("<a@example.com>");
        assert_eq!(state.in_reply_to(), Some("<a@example.com>"));
        assert_eq!(state.references_header().as_deref(), Some("<a@example.com>"));

        state.record_sent("<b@example.com>");
        assert_eq!(state.in_reply_to(), Some("<b@example.com>"));
        assert_eq!(
            state.references_header().as_deref(),
            Some("<a@example.com> <b@example.com>")
        );
    }

    #[test]
    fn save_and_load_round_trip_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("thread.json");
        assert_eq!(ThreadState::load(&path), ThreadState::default());

        let mut state = ThreadState::default();
        state.record_sent("<a@example.com>");
        state.save(&path).unwrap();
        assert_eq!(ThreadState::load(&path), state);
    }

    #[test]
    fn corrupt_file_starts_new_thread() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("thread.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ThreadState::load(&path), ThreadState::default());
    }
}
