//! Suggestion provider boundary.
//!
//! The editor decides *what kind* of candidates should be shown next and for
//! which field; a [`SuggestionProvider`] decides *which* candidates exist.
//! Requests are tagged with a [`RequestId`] so that a slow answer to an old
//! request never overwrites the answer to a newer one.

use crate::token::TokenKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// What the popup should list next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub kind: TokenKind,
    pub field: String,
}

impl SuggestionRequest {
    pub fn new(kind: TokenKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
        }
    }

    pub fn key() -> Self {
        Self::new(TokenKind::Key, "")
    }
}

/// A candidate picked by the user, to be inserted as `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionSelection {
    pub value: String,
    pub kind: TokenKind,
}

impl SuggestionSelection {
    pub fn new(value: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            desc: None,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("suggestion source unavailable: {0}")]
    Unavailable(String),
    #[error("no suggestions for {kind} on field `{field}`")]
    Unsupported { kind: TokenKind, field: String },
}

/// Supplies candidate lists. Must tolerate an empty `field` and `search`.
pub trait SuggestionProvider {
    fn options(
        &self,
        kind: TokenKind,
        field: &str,
        search: &str,
    ) -> Result<Vec<Candidate>, ProviderError>;
}

/// Monotonic id attached to every popup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestId(u64);

/// Issues request ids and rejects answers to superseded requests.
#[derive(Debug, Clone, Default)]
pub struct SuggestionFence {
    latest: u64,
}

impl SuggestionFence {
    pub fn issue(&mut self) -> RequestId {
        self.latest += 1;
        RequestId(self.latest)
    }

    /// Rejects every id issued so far, e.g. once the popup is closed.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }

    pub fn accept(&self, id: RequestId) -> bool {
        id.0 == self.latest
    }
}

/// Case-insensitive substring filter on id and name.
pub fn filter_candidates(candidates: Vec<Candidate>, search: &str) -> Vec<Candidate> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| c.id.to_lowercase().contains(&needle) || c.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn method_candidates() -> Vec<Candidate> {
    [
        (":", "equals"),
        (":*", "exists"),
        (">", "greater than"),
        ("<", "less than"),
        (">=", "greater than or equal"),
        ("<=", "less than or equal"),
    ]
    .into_iter()
    .map(|(id, desc)| Candidate::new(id, id).with_desc(desc))
    .collect()
}

pub fn condition_candidates() -> Vec<Candidate> {
    ["AND", "OR", "AND NOT"]
        .into_iter()
        .map(|id| Candidate::new(id, id))
        .collect()
}

/// Static provider backed by configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionCatalog {
    /// Known field names.
    pub keys: Vec<String>,
    /// Known values per field.
    pub values: HashMap<String, Vec<String>>,
}

impl SuggestionProvider for SuggestionCatalog {
    fn options(
        &self,
        kind: TokenKind,
        field: &str,
        search: &str,
    ) -> Result<Vec<Candidate>, ProviderError> {
        let candidates = match kind {
            TokenKind::Key => self.keys.iter().map(|k| Candidate::new(k, k)).collect(),
            TokenKind::Method => method_candidates(),
            TokenKind::Condition | TokenKind::ValueCondition => condition_candidates(),
            TokenKind::Value => self
                .values
                .get(field)
                .map(|values| values.iter().map(|v| Candidate::new(v, v)).collect())
                .unwrap_or_default(),
            TokenKind::Bracket | TokenKind::Split => {
                return Err(ProviderError::Unsupported {
                    kind,
                    field: field.to_string(),
                })
            }
        };
        Ok(filter_candidates(candidates, search))
    }
}
