//! Queue admission and two-party pairing on top of a [`KeyValueStore`].
//!
//! Each queue is a sorted set scored by arrival time. Pairing relies on the
//! store's conditional pop so that two concurrent callers can never both take
//! the same waiter, and a lone waiter is never removed. Store failures are
//! returned unchanged; nothing here retries.

use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::matching::MatchRecord;
use crate::models::queue::{QueueInfo, QueueKey, KEY_DELIMITER, QUEUE_KEY_PREFIX};
use crate::store::{KeyValueStore, StoreError};

const USER_KEY_PREFIX: &str = "user";
const USER_QUEUE_KEY_SUFFIX: &str = "queue";
const USER_MATCH_KEY_SUFFIX: &str = "matchId";
const PAIR_SIZE: usize = 2;

fn user_queue_key(user_id: &str) -> String {
    [USER_KEY_PREFIX, user_id, USER_QUEUE_KEY_SUFFIX].join(KEY_DELIMITER)
}

fn user_match_key(user_id: &str) -> String {
    [USER_KEY_PREFIX, user_id, USER_MATCH_KEY_SUFFIX].join(KEY_DELIMITER)
}

#[derive(Clone)]
pub struct PairingEngine {
    store: Arc<dyn KeyValueStore>,
    call_timeout: Duration,
    last_score_micros: Arc<AtomicI64>,
}

impl PairingEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, call_timeout: Duration) -> Self {
        PairingEngine {
            store,
            call_timeout,
            last_score_micros: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Runs one store call under the configured deadline.
    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.call_timeout))?
    }

    /// Arrival score in seconds, strictly increasing within this process.
    fn next_score(&self) -> f64 {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .last_score_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1) as f64 / 1_000_000.0
    }

    pub async fn enqueue(&self, queue_key: &QueueKey, user_id: &str) -> Result<(), StoreError> {
        let score = self.next_score();
        self.bounded(self.store.sorted_set_add(queue_key.as_str(), user_id, score))
            .await?;
        debug!("Enqueued {} on {} with score {}", user_id, queue_key, score);
        Ok(())
    }

    /// Takes the two earliest arrivals, or nothing if fewer than two are waiting.
    pub async fn pop_two(&self, queue_key: &QueueKey) -> Result<Vec<String>, StoreError> {
        self.bounded(self.store.pop_min_if_at_least(queue_key.as_str(), PAIR_SIZE))
            .await
    }

    pub async fn remove_from_queue(
        &self,
        queue_key: &QueueKey,
        user_id: &str,
    ) -> Result<bool, StoreError> {
        self.bounded(self.store.sorted_set_remove(queue_key.as_str(), user_id))
            .await
    }

    /// Zero-based position of the user, or `None` if not queued. Only a snapshot.
    pub async fn queue_rank(
        &self,
        queue_key: &QueueKey,
        user_id: &str,
    ) -> Result<Option<usize>, StoreError> {
        self.bounded(self.store.sorted_set_rank(queue_key.as_str(), user_id))
            .await
    }

    pub async fn queue_members(&self, queue_key: &QueueKey) -> Result<Vec<String>, StoreError> {
        self.bounded(self.store.sorted_set_members(queue_key.as_str()))
            .await
    }

    /// Writes the match and both participants' reverse index entries in one batch.
    pub async fn save_match(&self, record: &MatchRecord, ttl: Duration) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut entries = vec![(record.match_id.clone(), payload)];
        for user_id in &record.user_ids {
            entries.push((user_match_key(user_id), record.match_id.clone()));
        }

        self.bounded(self.store.set_many(&entries, ttl)).await
    }

    pub async fn get_match(&self, match_id: &str) -> Result<Option<MatchRecord>, StoreError> {
        match self.bounded(self.store.get(match_id)).await? {
            Some(payload) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn cancel_match(&self, match_id: &str) -> Result<bool, StoreError> {
        self.bounded(self.store.delete(match_id)).await
    }

    pub async fn save_user_queue(
        &self,
        user_id: &str,
        queue_key: &QueueKey,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.bounded(
            self.store
                .set(&user_queue_key(user_id), queue_key.as_str(), ttl),
        )
        .await
    }

    pub async fn get_user_queue(&self, user_id: &str) -> Result<Option<QueueKey>, StoreError> {
        let raw = self.bounded(self.store.get(&user_queue_key(user_id))).await?;
        Ok(raw.and_then(|raw| {
            let parsed = QueueKey::parse(&raw);
            if parsed.is_none() {
                warn!("Ignoring malformed queue index for {}: {}", user_id, raw);
            }
            parsed
        }))
    }

    pub async fn clear_user_queue(&self, user_id: &str) -> Result<bool, StoreError> {
        self.bounded(self.store.delete(&user_queue_key(user_id)))
            .await
    }

    pub async fn save_user_match(
        &self,
        user_id: &str,
        match_id: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.bounded(self.store.set(&user_match_key(user_id), match_id, ttl))
            .await
    }

    pub async fn get_user_match(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        self.bounded(self.store.get(&user_match_key(user_id))).await
    }

    pub async fn clear_user_match(&self, user_id: &str) -> Result<bool, StoreError> {
        self.bounded(self.store.delete(&user_match_key(user_id)))
            .await
    }

    /// Every queue that currently has at least one waiter.
    pub async fn list_queue_keys(&self) -> Result<Vec<QueueKey>, StoreError> {
        let prefix = format!("{}{}", QUEUE_KEY_PREFIX, KEY_DELIMITER);
        let keys = self.bounded(self.store.keys_with_prefix(&prefix)).await?;

        Ok(keys
            .into_iter()
            .filter_map(|raw| {
                let parsed = QueueKey::parse(&raw);
                if parsed.is_none() {
                    warn!("Skipping malformed queue key: {}", raw);
                }
                parsed
            })
            .collect())
    }

    pub async fn list_queues(&self) -> Result<Vec<QueueInfo>, StoreError> {
        let mut queues = Vec::new();

        for key in self.list_queue_keys().await? {
            let size = match self.bounded(self.store.sorted_set_len(key.as_str())).await {
                Ok(size) => size,
                Err(e) => {
                    warn!("Error getting size for queue {}: {}", key, e);
                    continue;
                }
            };
            if size == 0 {
                continue;
            }

            queues.push(QueueInfo {
                topics: key.topics(),
                difficulty: key.difficulty(),
                key,
                size,
            });
        }

        Ok(queues)
    }
}
