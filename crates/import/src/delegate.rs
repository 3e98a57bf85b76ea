//! External text classification, consulted before the keyword rules.

use async_trait::async_trait;
use bankin_core::Direction;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// What the delegate is asked: which of `candidates` fits `description`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DelegateRequest {
    pub description: String,
    pub direction: Direction,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateOutcome {
    /// The delegate named a category. Not yet checked against the candidates.
    Matched(String),
    Abstained,
}

#[derive(Error, Debug)]
pub enum DelegateError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Delegate returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait DelegateClassifier: Send + Sync {
    async fn classify(&self, request: &DelegateRequest) -> Result<DelegateOutcome, DelegateError>;
}

/// Reply prefixes some classifiers put before the category name.
const REPLY_PREFIXES: &[&str] = &["카테고리:", "답변:", "category:"];

/// Reduces a free-form reply to a bare category name: first non-empty line,
/// known prefixes removed, surrounding quotes and whitespace trimmed.
pub fn clean_reply(reply: &str) -> Option<String> {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty())?;

    let mut name = line;
    for prefix in REPLY_PREFIXES {
        if name.len() >= prefix.len()
            && name.is_char_boundary(prefix.len())
            && name[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            name = name[prefix.len()..].trim();
        }
    }
    let name = name.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    (!name.is_empty()).then(|| name.to_string())
}

/// Maps a delegate answer onto one of `candidates`: exact name first, then a
/// name contained in the answer, then the answer contained in a name.
pub fn match_candidate<'a>(answer: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    candidates
        .iter()
        .find(|c| **c == answer)
        .or_else(|| candidates.iter().find(|c| answer.contains(**c)))
        .or_else(|| candidates.iter().find(|c| c.contains(answer)))
        .copied()
}

#[derive(Debug, Deserialize)]
struct DelegateReply {
    #[serde(default)]
    category: Option<String>,
}

/// Delegate reached over HTTP: POSTs the request as JSON and reads
/// `{"category": "..."}` back. An empty or missing category is an abstention.
pub struct HttpDelegate {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpDelegate {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DelegateError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DelegateClassifier for HttpDelegate {
    async fn classify(&self, request: &DelegateRequest) -> Result<DelegateOutcome, DelegateError> {
        let mut call = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;
        if !response.status().is_success() {
            return Err(DelegateError::Status(response.status().as_u16()));
        }

        let reply: DelegateReply = response.json().await?;
        Ok(match reply.category.as_deref().and_then(clean_reply) {
            Some(name) => DelegateOutcome::Matched(name),
            None => DelegateOutcome::Abstained,
        })
    }
}
