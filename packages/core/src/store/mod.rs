//! Key-value store adapters consumed by the pairing engine.
//!
//! The pairing engine needs ordered sets (one per queue), string values with
//! expiry (indexes and match records), and two atomic primitives: a
//! conditional pop and a multi-key batch write. Everything else is a single
//! call and safe to issue concurrently.

pub mod dynamodb;
pub mod errors;
pub mod memory;

use async_trait::async_trait;
use std::time::Duration;

pub use dynamodb::DynamoDbStore;
pub use errors::StoreError;
pub use memory::InMemoryStore;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Inserts `member` with `score`, replacing the score if it is already present.
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// All members, lowest score first. Equal scores are ordered by member.
    async fn sorted_set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn sorted_set_rank(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError>;

    async fn sorted_set_len(&self, key: &str) -> Result<usize, StoreError>;

    /// Atomically removes and returns the `count` lowest-scored members, but only
    /// when at least `count` are present. Otherwise nothing is removed and the
    /// result is empty.
    async fn pop_min_if_at_least(&self, key: &str, count: usize)
        -> Result<Vec<String>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Writes every entry or none of them.
    async fn set_many(&self, entries: &[(String, String)], ttl: Duration)
        -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Distinct live keys starting with `prefix`, in no particular order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
