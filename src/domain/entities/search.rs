use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ScoredDocument};

pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub top_k: usize,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }

    /// Rejects queries the store cannot answer meaningfully.
    pub fn validate(&self, max_top_k: usize) -> Result<(), DomainError> {
        if self.query.trim().is_empty() {
            return Err(DomainError::validation("query must not be empty"));
        }
        if self.top_k < 1 {
            return Err(DomainError::validation("top_k must be at least 1"));
        }
        if self.top_k > max_top_k {
            return Err(DomainError::validation(format!(
                "top_k must be at most {max_top_k}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub score: f32,
    pub summary: String,
}

impl SearchResult {
    pub fn from_scored(doc: ScoredDocument, summary: String) -> Self {
        Self {
            id: doc.id,
            content: doc.content,
            score: doc.distance,
            summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl SearchSuggestion {
    pub fn content(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            kind: "content".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStats {
    pub total_documents: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentStats {
    pub fn new(total_documents: usize, collection_name: impl Into<String>) -> Self {
        Self {
            total_documents,
            collection_name: Some(collection_name.into()),
            last_updated: Some(Utc::now()),
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            total_documents: 0,
            collection_name: None,
            last_updated: None,
            error: Some(error.into()),
        }
    }
}

/// Builds query suggestions from the leading words of each document.
///
/// Each document contributes its first `max_tokens` whitespace-separated
/// tokens joined by single spaces. Empty phrases and exact duplicates are
/// skipped and at most `limit` suggestions are returned.
pub fn derive_suggestions<'a, I>(contents: I, max_tokens: usize, limit: usize) -> Vec<SearchSuggestion>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut suggestions: Vec<SearchSuggestion> = Vec::new();

    for content in contents {
        if suggestions.len() >= limit {
            break;
        }

        let phrase = content
            .split_whitespace()
            .take(max_tokens)
            .collect::<Vec<_>>()
            .join(" ");

        if phrase.is_empty() || suggestions.iter().any(|s| s.query == phrase) {
            continue;
        }

        suggestions.push(SearchSuggestion::content(phrase));
    }

    suggestions
}
