#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use matching_core::models::question::Question;
use matching_core::repositories::errors::upstream_errors::UpstreamError;
use matching_core::repositories::pairing_engine::PairingEngine;
use matching_core::repositories::question_repository::QuestionCatalogRepository;
use matching_core::repositories::user_history_repository::UserHistoryRepository;
use matching_core::services::{MatchingService, QuestionSelector};
use matching_core::store::InMemoryStore;

/// Completed questions per user. Unknown users have solved nothing.
#[derive(Default)]
pub struct StaticHistory {
    pub completed: HashMap<String, HashSet<String>>,
}

impl StaticHistory {
    pub fn with(mut self, user_id: &str, question_ids: &[&str]) -> Self {
        self.completed.insert(
            user_id.to_string(),
            question_ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl UserHistoryRepository for StaticHistory {
    async fn get_completed_questions(
        &self,
        user_id: &str,
    ) -> Result<HashSet<String>, UpstreamError> {
        Ok(self.completed.get(user_id).cloned().unwrap_or_default())
    }
}

/// Returns the same candidate list for every call, or fails every call.
pub struct StaticCatalog {
    pub question_ids: Vec<String>,
    pub fail: bool,
    pub calls: Mutex<usize>,
}

impl StaticCatalog {
    pub fn serving(question_ids: &[&str]) -> Self {
        StaticCatalog {
            question_ids: question_ids.iter().map(|id| id.to_string()).collect(),
            fail: false,
            calls: Mutex::new(0),
        }
    }

    pub fn failing() -> Self {
        StaticCatalog {
            question_ids: Vec::new(),
            fail: true,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl QuestionCatalogRepository for StaticCatalog {
    async fn get_questions(
        &self,
        difficulty: &str,
        _tag: Option<&str>,
        sample_size: usize,
    ) -> Result<Vec<Question>, UpstreamError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            return Err(UpstreamError::Status(503));
        }

        Ok(self
            .question_ids
            .iter()
            .take(sample_size)
            .map(|id| Question {
                id: id.clone(),
                title: format!("Question {}", id),
                title_slug: id.clone(),
                difficulty: difficulty.to_string(),
                question: String::new(),
                example_testcases: String::new(),
                topic_tags: Vec::new(),
            })
            .collect())
    }
}

pub fn build_service(
    history: StaticHistory,
    catalog: Arc<StaticCatalog>,
) -> MatchingService {
    let engine = PairingEngine::new(Arc::new(InMemoryStore::default()), Duration::from_secs(5));
    let selector = QuestionSelector::new(Arc::new(history), catalog);
    MatchingService::new(engine, selector, Duration::from_secs(600))
}

pub fn topics() -> Vec<String> {
    vec!["array".to_string(), "hash-table".to_string()]
}
