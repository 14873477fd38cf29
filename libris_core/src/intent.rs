//! Closed intent vocabulary produced by classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What the user wants from the current turn.
///
/// A turn may carry several intents at once; each one independently
/// triggers its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Intent {
    Recommend,
    Talk,
    SavePreferences,
    SaveReadBooks,
    End,
}

impl Intent {
    pub const ALL: [Self; 5] = [
        Self::Recommend,
        Self::Talk,
        Self::SavePreferences,
        Self::SaveReadBooks,
        Self::End,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recommend => "recommend",
            Self::Talk => "talk",
            Self::SavePreferences => "savePreferences",
            Self::SaveReadBooks => "saveReadBooks",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown intent label: {0}")]
pub struct UnknownIntent(pub String);

impl FromStr for Intent {
    type Err = UnknownIntent;

    /// Accepts the canonical labels plus the snake-case and short tags
    /// models tend to emit (`recommendation`, `preferences`, `read`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "recommend" | "recommendation" | "recommendbooks" => Ok(Self::Recommend),
            "talk" | "converse" => Ok(Self::Talk),
            "savepreferences" | "preferences" => Ok(Self::SavePreferences),
            "savereadbooks" | "readbooks" | "read" => Ok(Self::SaveReadBooks),
            "end" => Ok(Self::End),
            _ => Err(UnknownIntent(s.to_string())),
        }
    }
}
