//! The summarization service's response, as handed to the renderer.

use serde::Deserialize;

pub const DEFAULT_TITLE: &str = "Unknown Video";
pub const DEFAULT_SUMMARY: &str = "No summary generated.";
pub const DEFAULT_ERROR: &str = "Failed to fetch with unknown API error";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("summary fetch failed: {0}")]
    Failed(String),
}

/// `{ success, title?, summary?, error? }` as returned by the service.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FetchResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A successfully fetched note: its title and raw Markdown summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedNote {
    pub title: String,
    pub summary: String,
}

impl FetchResult {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Anything other than `success: true` is a failure. Empty or missing
    /// title and summary fall back to placeholders.
    pub fn into_note(self) -> Result<FetchedNote, FetchError> {
        if !self.success {
            let message = self
                .error
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_ERROR.to_string());
            return Err(FetchError::Failed(message));
        }
        Ok(FetchedNote {
            title: non_empty_or(self.title, DEFAULT_TITLE),
            summary: non_empty_or(self.summary, DEFAULT_SUMMARY),
        })
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
