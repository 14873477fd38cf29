//! Conversation history windowing.
//!
//! The window keeps the opening message of the conversation (it anchors the
//! summary) and the most recent exchange, and drops everything in between.

use libris_core::ChatMessage;
use serde::{Deserialize, Serialize};

/// Configuration for the history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of trailing messages to keep (the latest exchange by default).
    #[serde(default = "HistoryConfig::default_keep_recent")]
    pub keep_recent: usize,
    /// Whether to always keep the first message of the conversation.
    #[serde(default = "HistoryConfig::default_keep_first")]
    pub keep_first: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            keep_recent: Self::default_keep_recent(),
            keep_first: Self::default_keep_first(),
        }
    }
}

impl HistoryConfig {
    const fn default_keep_recent() -> usize {
        2
    }

    const fn default_keep_first() -> bool {
        true
    }

    #[must_use]
    pub const fn with_keep_recent(mut self, keep_recent: usize) -> Self {
        self.keep_recent = keep_recent;
        self
    }

    #[must_use]
    pub const fn with_keep_first(mut self, keep: bool) -> Self {
        self.keep_first = keep;
        self
    }
}

/// Trims retained history between turns.
#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    config: HistoryConfig,
}

impl HistoryWindow {
    #[must_use]
    pub const fn with_config(config: HistoryConfig) -> Self {
        Self { config }
    }

    /// Prune `messages` to the first message plus the last `keep_recent`.
    ///
    /// Pure and idempotent: trimming an already-trimmed sequence returns it
    /// unchanged. Conversations of zero or one message are never trimmed, and
    /// at least the latest message is always kept.
    #[must_use]
    pub fn trim(&self, messages: &[ChatMessage]) -> Vec<ChatMessage> {
        let keep_recent = self.config.keep_recent.max(1);
        let head = usize::from(self.config.keep_first);

        if messages.len() <= head + keep_recent {
            return messages.to_vec();
        }

        let tail_start = messages.len() - keep_recent;
        messages[..head]
            .iter()
            .chain(&messages[tail_start..])
            .cloned()
            .collect()
    }

    #[must_use]
    pub const fn config(&self) -> &HistoryConfig {
        &self.config
    }
}
