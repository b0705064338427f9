use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub title_slug: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub example_testcases: String,
    #[serde(default)]
    pub topic_tags: Vec<TopicTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TopicTag {
    pub name: String,
    pub slug: String,
}

/// Body returned by the user history service for a user's solved questions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletedQuestionsResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Vec<String>,
}
