use std::sync::Arc;

use matching_core::config::MatchingConfig;
use matching_core::repositories::errors::upstream_errors::UpstreamError;
use matching_core::repositories::pairing_engine::PairingEngine;
use matching_core::repositories::question_repository::HttpQuestionCatalogRepository;
use matching_core::repositories::user_history_repository::HttpUserHistoryRepository;
use matching_core::services::{MatchingService, QuestionSelector};
use matching_core::store::KeyValueStore;

#[derive(Clone)]
pub struct AppState {
    pub matching_service: Arc<MatchingService>,
}

impl AppState {
    /// Wires the HTTP upstream clients and the pairing engine around an
    /// already constructed store.
    pub fn from_config(
        config: &MatchingConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, UpstreamError> {
        let history = Arc::new(HttpUserHistoryRepository::new(
            &config.user_service_url,
            config.upstream_timeout,
        )?);
        let catalog = Arc::new(HttpQuestionCatalogRepository::new(
            &config.question_service_url,
            config.upstream_timeout,
        )?);

        let engine = PairingEngine::new(store, config.store_timeout);
        let selector = QuestionSelector::new(history, catalog);

        Ok(AppState {
            matching_service: Arc::new(MatchingService::new(engine, selector, config.match_ttl)),
        })
    }
}
