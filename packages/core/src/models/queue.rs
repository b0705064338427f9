use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const KEY_DELIMITER: &str = ":";
pub const QUEUE_KEY_PREFIX: &str = "queue";
const QUEUE_KEY_PARTS: usize = 3;
const TOPIC_DELIMITER: &str = ",";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueKeyError {
    #[error("topic {0:?} must not contain ':' or ','")]
    ReservedInTopic(String),
    #[error("difficulty {0:?} must not contain ':'")]
    ReservedInDifficulty(String),
}

/// Canonical identifier of a waiting line.
/// Format: "queue:<sorted topics joined by ','>:<difficulty>", e.g. "queue:array,hash-table:easy".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueKey(String);

impl QueueKey {
    /// Builds the key for a topic set and difficulty. Any permutation of the same
    /// topics yields the same key; the caller's slice is left untouched.
    pub fn build(topics: &[String], difficulty: &str) -> Self {
        QueueKey(format!(
            "{}{}{}{}{}",
            QUEUE_KEY_PREFIX,
            KEY_DELIMITER,
            joined_topics(topics),
            KEY_DELIMITER,
            difficulty
        ))
    }

    /// Like [`QueueKey::build`], but refuses components that would make the key
    /// ambiguous or impossible to parse back.
    pub fn try_build(topics: &[String], difficulty: &str) -> Result<Self, QueueKeyError> {
        if let Some(topic) = topics
            .iter()
            .find(|t| t.contains(KEY_DELIMITER) || t.contains(TOPIC_DELIMITER))
        {
            return Err(QueueKeyError::ReservedInTopic(topic.clone()));
        }
        if difficulty.contains(KEY_DELIMITER) {
            return Err(QueueKeyError::ReservedInDifficulty(difficulty.to_string()));
        }
        Ok(Self::build(topics, difficulty))
    }

    /// Wraps a raw key read back from the store, rejecting anything that is not a queue key.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::components_of(raw).map(|_| QueueKey(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The "<topics>:<difficulty>" part of the key, used to derive match IDs.
    pub fn suffix(&self) -> &str {
        self.0
            .strip_prefix(QUEUE_KEY_PREFIX)
            .and_then(|rest| rest.strip_prefix(KEY_DELIMITER))
            .unwrap_or(&self.0)
    }

    pub fn topics(&self) -> Vec<String> {
        Self::components_of(&self.0)
            .map(|(topics, _)| topics)
            .unwrap_or_default()
    }

    pub fn difficulty(&self) -> String {
        Self::components_of(&self.0)
            .map(|(_, difficulty)| difficulty)
            .unwrap_or_default()
    }

    /// Splits "queue:<topics>:<difficulty>" back into its components.
    /// An empty topics part yields an empty topic list.
    fn components_of(raw: &str) -> Option<(Vec<String>, String)> {
        let parts: Vec<&str> = raw.split(KEY_DELIMITER).collect();
        if parts.len() != QUEUE_KEY_PARTS || parts[0] != QUEUE_KEY_PREFIX {
            return None;
        }

        let topics = if parts[1].is_empty() {
            Vec::new()
        } else {
            parts[1].split(TOPIC_DELIMITER).map(str::to_string).collect()
        };

        Some((topics, parts[2].to_string()))
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueueKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn joined_topics(topics: &[String]) -> String {
    let mut sorted = topics.to_vec();
    sorted.sort();
    sorted.join(TOPIC_DELIMITER)
}

/// A waiting user as seen by the queue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueUser {
    pub user_id: String,
    pub topics: Vec<String>,
    pub difficulty: String,
}

/// Summary of one active queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueInfo {
    pub key: QueueKey,
    pub topics: Vec<String>,
    pub difficulty: String,
    pub size: usize,
}
