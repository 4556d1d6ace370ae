//! Value types held by the session

use crate::llm::NormalizedResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Credential group key -> secret
///
/// Empty values count as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeys(BTreeMap<String, String>);

impl ApiKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: &str) -> Option<&str> {
        self.0
            .get(group)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }

    pub fn contains(&self, group: &str) -> bool {
        self.get(group).is_some()
    }

    /// Copy with one group set
    pub fn with(&self, group: impl Into<String>, key: impl Into<String>) -> Self {
        let mut keys = self.0.clone();
        keys.insert(group.into(), key.into());
        Self(keys)
    }

    /// Copy with one group removed
    pub fn without(&self, group: &str) -> Self {
        let mut keys = self.0.clone();
        keys.remove(group);
        Self(keys)
    }

    /// Configured groups, ignoring empty values
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ApiKeys {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Show the first and last few characters of a secret
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Results in arrival order, at most one per model id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResponseCollection {
    results: Vec<NormalizedResult>,
}

impl ResponseCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result, dropping any earlier one for the same model
    ///
    /// The new result goes to the end: order tracks the latest arrival.
    pub fn upsert(&mut self, result: NormalizedResult) {
        self.results.retain(|r| r.model_id != result.model_id);
        self.results.push(result);
    }

    pub fn get(&self, model_id: &str) -> Option<&NormalizedResult> {
        self.results.iter().find(|r| r.model_id == model_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[NormalizedResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResponseCollection {
    type Item = &'a NormalizedResult;
    type IntoIter = std::slice::Iter<'a, NormalizedResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Outcome of the last synthesis request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "lowercase")]
pub enum SummaryState {
    #[default]
    Empty,
    Ready(String),
    /// Error text shown in place of the summary
    Failed(String),
}

impl SummaryState {
    pub fn text(&self) -> Option<&str> {
        match self {
            SummaryState::Empty => None,
            SummaryState::Ready(text) | SummaryState::Failed(text) => Some(text),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SummaryState::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the session's message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            model_id: None,
        }
    }

    pub fn assistant(model_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            model_id: Some(model_id.into()),
        }
    }
}
