pub mod requests;
pub mod responses;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::queue::{QueueKey, KEY_DELIMITER};

pub const MATCH_KEY_PREFIX: &str = "match";

/// A committed pairing of two users with an assigned question.
/// Stored as JSON under its own ID, e.g. "match:array,hash-table:easy:1718000000000000000".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub match_id: String,
    pub user_ids: Vec<String>,
    pub question_id: String,
    pub queue_key: QueueKey,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(
        queue_key: &QueueKey,
        first_user_id: &str,
        second_user_id: &str,
        question_id: &str,
        ttl: Duration,
    ) -> Self {
        let created_at = Utc::now();
        let nanos = created_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| created_at.timestamp_micros() * 1_000);
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::zero());

        MatchRecord {
            match_id: format!(
                "{}{}{}{}{}",
                MATCH_KEY_PREFIX,
                KEY_DELIMITER,
                queue_key.suffix(),
                KEY_DELIMITER,
                nanos
            ),
            user_ids: vec![first_user_id.to_string(), second_user_id.to_string()],
            question_id: question_id.to_string(),
            queue_key: queue_key.clone(),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn includes(&self, user_id: &str) -> bool {
        self.user_ids.iter().any(|id| id == user_id)
    }

    /// The other participant, from `user_id`'s point of view.
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        if !self.includes(user_id) {
            return None;
        }
        self.user_ids
            .iter()
            .find(|id| id.as_str() != user_id)
            .map(String::as_str)
    }
}
