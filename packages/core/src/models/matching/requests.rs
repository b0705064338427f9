use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub user_id: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub difficulty: String,
}
