use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{KeyValueStore, StoreError};

/// Process-local store. Every operation runs under a single lock, which makes
/// the conditional pop and the batch write atomic with respect to each other.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    sorted_sets: HashMap<String, HashMap<String, f64>>,
    values: HashMap<String, (String, Instant)>,
}

impl Inner {
    fn ordered_members(&self, key: &str) -> Vec<String> {
        let Some(set) = self.sorted_sets.get(key) else {
            return Vec::new();
        };
        let mut entries: Vec<(&String, &f64)> = set.iter().collect();
        entries.sort_by(|(a_member, a_score), (b_member, b_score)| {
            a_score
                .total_cmp(b_score)
                .then_with(|| a_member.cmp(b_member))
        });
        entries
            .into_iter()
            .map(|(member, _)| member.clone())
            .collect()
    }

    fn live_value(&mut self, key: &str) -> Option<String> {
        let expired = match self.values.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => {
                return Some(value.clone())
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.values.remove(key);
        }
        None
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .sorted_sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(set) = inner.sorted_sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = set.remove(member).is_some();
        if set.is_empty() {
            inner.sorted_sets.remove(key);
        }
        Ok(removed)
    }

    async fn sorted_set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.ordered_members(key))
    }

    async fn sorted_set_rank(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ordered_members(key)
            .iter()
            .position(|candidate| candidate == member))
    }

    async fn sorted_set_len(&self, key: &str) -> Result<usize, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.sorted_sets.get(key).map_or(0, HashMap::len))
    }

    async fn pop_min_if_at_least(
        &self,
        key: &str,
        count: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        let members = inner.ordered_members(key);
        if count == 0 || members.len() < count {
            return Ok(Vec::new());
        }

        let popped: Vec<String> = members.into_iter().take(count).collect();
        if let Some(set) = inner.sorted_sets.get_mut(key) {
            for member in &popped {
                set.remove(member);
            }
            if set.is_empty() {
                inner.sorted_sets.remove(key);
            }
        }
        Ok(popped)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .values
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn set_many(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let expires_at = Instant::now() + ttl;
        for (key, value) in entries {
            inner
                .values
                .insert(key.clone(), (value.clone(), expires_at));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let existed = inner.live_value(key).is_some();
        inner.values.remove(key);
        Ok(existed)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        inner.values.retain(|_, (_, expires_at)| *expires_at > now);

        let keys: BTreeSet<String> = inner
            .sorted_sets
            .keys()
            .chain(inner.values.keys())
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        Ok(keys.into_iter().collect())
    }
}
