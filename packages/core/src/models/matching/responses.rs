use serde::{Deserialize, Serialize};

use crate::models::queue::QueueKey;

/// Result of a match request, always from the requesting user's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum MatchOutcome {
    Waiting {
        queue_key: QueueKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },
    Matched {
        match_id: String,
        partner_id: String,
        question_id: String,
    },
    NoSuitableQuestion,
}

/// Where a user currently stands. Matched takes priority over Waiting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum UserStatus {
    Matched {
        match_id: String,
    },
    Waiting {
        queue: QueueKey,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
    },
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CancelOutcome {
    CancelledMatched { match_id: String },
    CancelledWaiting { queue: QueueKey },
    Cancelled { match_id: String },
    NotFound,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
