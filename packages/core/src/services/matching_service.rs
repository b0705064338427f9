use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::matching::requests::MatchRequest;
use crate::models::matching::responses::{CancelOutcome, MatchOutcome, UserStatus};
use crate::models::matching::MatchRecord;
use crate::models::queue::{QueueInfo, QueueKey, QueueUser};
use crate::repositories::pairing_engine::PairingEngine;
use crate::services::errors::matching_service_errors::MatchingServiceError;
use crate::services::question_selector::QuestionSelector;

/// Drives each user through Idle, Waiting and Matched.
///
/// Coordination between concurrent requests lives entirely in the store; this
/// service holds no locks of its own.
#[derive(Clone)]
pub struct MatchingService {
    engine: PairingEngine,
    selector: QuestionSelector,
    ttl: Duration,
}

impl MatchingService {
    pub fn new(engine: PairingEngine, selector: QuestionSelector, ttl: Duration) -> Self {
        MatchingService {
            engine,
            selector,
            ttl,
        }
    }

    pub async fn request_match(
        &self,
        request: &MatchRequest,
    ) -> Result<MatchOutcome, MatchingServiceError> {
        let user_id = request.user_id.trim();
        if user_id.is_empty() {
            return Err(MatchingServiceError::ValidationError(
                "userId is required".to_string(),
            ));
        }
        if request.difficulty.trim().is_empty() {
            return Err(MatchingServiceError::ValidationError(
                "difficulty is required".to_string(),
            ));
        }

        if let Some(record) = self.live_match_for(user_id).await? {
            info!(
                "User {} already has match {}, returning it",
                user_id, record.match_id
            );
            return Ok(matched_outcome(&record, user_id));
        }

        let queue_key = QueueKey::try_build(&request.topics, &request.difficulty)
            .map_err(|e| MatchingServiceError::ValidationError(e.to_string()))?;
        let already_waiting = self.already_waiting_in(user_id, &queue_key).await?;
        // The index goes in first so a concurrent pop of this user clears it
        // rather than racing with it.
        self.engine
            .save_user_queue(user_id, &queue_key, self.ttl)
            .await?;
        if !already_waiting {
            self.engine.enqueue(&queue_key, user_id).await?;
            info!("User {} joined queue {}", user_id, queue_key);
        }

        let popped = self.engine.pop_two(&queue_key).await?;
        let [first, second] = match popped.as_slice() {
            [first, second] => [first.as_str(), second.as_str()],
            _ => return Ok(self.waiting_outcome(queue_key, user_id).await),
        };
        info!("Paired {} and {} from {}", first, second, queue_key);

        let question_id = self
            .selector
            .select_question(first, second, &request.topics, &request.difficulty)
            .await;

        let Some(question_id) = question_id else {
            warn!(
                "No suitable question for {} and {} on {}; both return to idle",
                first, second, queue_key
            );
            for paired in [first, second] {
                self.clear_user_queue_best_effort(paired).await;
            }
            if first == user_id || second == user_id {
                return Ok(MatchOutcome::NoSuitableQuestion);
            }
            return Ok(self.waiting_outcome(queue_key, user_id).await);
        };

        let record = MatchRecord::new(&queue_key, first, second, &question_id, self.ttl);
        if let Err(e) = self.engine.save_match(&record, self.ttl).await {
            error!(
                "Failed to save match for {} and {}, returning both to {}: {}",
                first, second, queue_key, e
            );
            self.requeue_best_effort(&queue_key, [first, second]).await;
            return Err(e.into());
        }
        for paired in [first, second] {
            self.clear_user_queue_best_effort(paired).await;
        }
        info!(
            "Created match {} for {} and {} with question {}",
            record.match_id, first, second, question_id
        );

        if record.includes(user_id) {
            Ok(matched_outcome(&record, user_id))
        } else {
            Ok(self.waiting_outcome(queue_key, user_id).await)
        }
    }

    pub async fn check_match_status(
        &self,
        match_id: &str,
    ) -> Result<MatchRecord, MatchingServiceError> {
        self.engine
            .get_match(match_id)
            .await?
            .ok_or_else(|| MatchingServiceError::MatchNotFound(match_id.to_string()))
    }

    pub async fn check_user_status(
        &self,
        user_id: &str,
    ) -> Result<UserStatus, MatchingServiceError> {
        if let Some(record) = self.live_match_for(user_id).await? {
            return Ok(UserStatus::Matched {
                match_id: record.match_id,
            });
        }

        let Some(queue) = self.engine.get_user_queue(user_id).await? else {
            return Ok(UserStatus::NotFound);
        };

        match self.engine.queue_rank(&queue, user_id).await {
            Ok(Some(position)) => Ok(UserStatus::Waiting {
                queue,
                position: Some(position),
            }),
            Ok(None) => Ok(UserStatus::NotFound),
            Err(e) => {
                warn!(
                    "Error getting rank for {} in {}, omitting position: {}",
                    user_id, queue, e
                );
                Ok(UserStatus::Waiting {
                    queue,
                    position: None,
                })
            }
        }
    }

    pub async fn cancel_match(
        &self,
        match_id: &str,
    ) -> Result<CancelOutcome, MatchingServiceError> {
        let Some(record) = self.engine.get_match(match_id).await? else {
            return Ok(CancelOutcome::NotFound);
        };

        self.engine.cancel_match(match_id).await?;
        self.clear_participants(&record).await;
        info!("Cancelled match {}", match_id);

        Ok(CancelOutcome::Cancelled {
            match_id: record.match_id,
        })
    }

    pub async fn cancel_by_user(
        &self,
        user_id: &str,
    ) -> Result<CancelOutcome, MatchingServiceError> {
        if let Some(match_id) = self.engine.get_user_match(user_id).await? {
            match self.engine.get_match(&match_id).await? {
                Some(record) => {
                    self.engine.cancel_match(&match_id).await?;
                    self.clear_participants(&record).await;
                    info!("User {} cancelled match {}", user_id, match_id);
                    return Ok(CancelOutcome::CancelledMatched { match_id });
                }
                None => {
                    warn!(
                        "User {} pointed at missing match {}, clearing index",
                        user_id, match_id
                    );
                    self.clear_user_match_best_effort(user_id).await;
                }
            }
        }

        if let Some(queue) = self.engine.get_user_queue(user_id).await? {
            self.engine.remove_from_queue(&queue, user_id).await?;
            self.clear_user_queue_best_effort(user_id).await;
            info!("User {} left queue {}", user_id, queue);
            return Ok(CancelOutcome::CancelledWaiting { queue });
        }

        Ok(CancelOutcome::NotFound)
    }

    /// Every waiting user across all queues, with topics and difficulty read
    /// back from the queue key.
    pub async fn list_queue_users(&self) -> Result<Vec<QueueUser>, MatchingServiceError> {
        let mut users = Vec::new();

        for key in self.engine.list_queue_keys().await? {
            let members = match self.engine.queue_members(&key).await {
                Ok(members) => members,
                Err(e) => {
                    warn!("Error listing members of {}: {}", key, e);
                    continue;
                }
            };

            let topics = key.topics();
            let difficulty = key.difficulty();
            users.extend(members.into_iter().map(|user_id| QueueUser {
                user_id,
                topics: topics.clone(),
                difficulty: difficulty.clone(),
            }));
        }

        Ok(users)
    }

    pub async fn list_queues(&self) -> Result<Vec<QueueInfo>, MatchingServiceError> {
        Ok(self.engine.list_queues().await?)
    }

    /// The user's match, if the index points at a record that still exists
    /// and still names them.
    async fn live_match_for(
        &self,
        user_id: &str,
    ) -> Result<Option<MatchRecord>, MatchingServiceError> {
        let Some(match_id) = self.engine.get_user_match(user_id).await? else {
            return Ok(None);
        };

        Ok(self
            .engine
            .get_match(&match_id)
            .await?
            .filter(|record| record.includes(user_id)))
    }

    /// True when the user is already queued on `queue_key`. A live entry on
    /// any other queue is removed so the user only ever waits in one place.
    async fn already_waiting_in(
        &self,
        user_id: &str,
        queue_key: &QueueKey,
    ) -> Result<bool, MatchingServiceError> {
        let Some(existing) = self.engine.get_user_queue(user_id).await? else {
            return Ok(false);
        };

        if &existing == queue_key {
            return Ok(self.engine.queue_rank(queue_key, user_id).await?.is_some());
        }

        if self.engine.remove_from_queue(&existing, user_id).await? {
            info!("User {} moved from {} to {}", user_id, existing, queue_key);
        }
        Ok(false)
    }

    async fn waiting_outcome(&self, queue_key: QueueKey, user_id: &str) -> MatchOutcome {
        let position = match self.engine.queue_rank(&queue_key, user_id).await {
            Ok(position) => position,
            Err(e) => {
                warn!("Error getting rank for {} in {}: {}", user_id, queue_key, e);
                None
            }
        };

        MatchOutcome::Waiting {
            queue_key,
            position,
        }
    }

    async fn clear_participants(&self, record: &MatchRecord) {
        for participant in &record.user_ids {
            // Leave the index alone if it already moved on to a newer match.
            match self.engine.get_user_match(participant).await {
                Ok(Some(current)) if current != record.match_id => continue,
                Ok(_) => self.clear_user_match_best_effort(participant).await,
                Err(e) => warn!("Error reading match index for {}: {}", participant, e),
            }
        }
    }

    /// Puts popped users back when their match could not be committed. Their
    /// queue indexes were never cleared, so status lookups see them waiting again.
    async fn requeue_best_effort(&self, queue_key: &QueueKey, user_ids: [&str; 2]) {
        for user_id in user_ids {
            if let Err(e) = self.engine.enqueue(queue_key, user_id).await {
                error!(
                    "Failed to return {} to {}, user dropped from queue: {}",
                    user_id, queue_key, e
                );
            }
        }
    }

    async fn clear_user_match_best_effort(&self, user_id: &str) {
        if let Err(e) = self.engine.clear_user_match(user_id).await {
            warn!("Failed to clear match index for {}: {}", user_id, e);
        }
    }

    async fn clear_user_queue_best_effort(&self, user_id: &str) {
        if let Err(e) = self.engine.clear_user_queue(user_id).await {
            warn!("Failed to clear queue index for {}: {}", user_id, e);
        }
    }
}

fn matched_outcome(record: &MatchRecord, user_id: &str) -> MatchOutcome {
    MatchOutcome::Matched {
        match_id: record.match_id.clone(),
        partner_id: record.partner_of(user_id).unwrap_or_default().to_string(),
        question_id: record.question_id.clone(),
    }
}
