use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, ReturnValue, TransactWriteItem};
use aws_sdk_dynamodb::Client;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::debug;

use super::{KeyValueStore, StoreError};

/// Sort key reserved for plain string values; sorted-set members use their own ID.
const VALUE_MEMBER: &str = "@value";

type Item = HashMap<String, AttributeValue>;

/// One row of the matching table.
/// PK: "key" (queue key, index key or match ID), SK: "member" (user ID or "@value").
/// "expires_at" is the table's TTL attribute, in epoch seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct StoreItem {
    key: String,
    member: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

impl StoreItem {
    fn scored(key: &str, member: &str, score: f64) -> Self {
        StoreItem {
            key: key.to_string(),
            member: member.to_string(),
            score: Some(score),
            value: None,
            expires_at: None,
        }
    }

    fn value(key: &str, value: &str, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        StoreItem {
            key: key.to_string(),
            member: VALUE_MEMBER.to_string(),
            score: None,
            value: Some(value.to_string()),
            expires_at: Some(Utc::now().timestamp().saturating_add(ttl_secs)),
        }
    }

    /// DynamoDB removes expired items lazily, so expiry is also enforced on read.
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

pub struct DynamoDbStore {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn item_key(key: &str, member: &str) -> Item {
        HashMap::from([
            ("key".to_string(), AttributeValue::S(key.to_string())),
            ("member".to_string(), AttributeValue::S(member.to_string())),
        ])
    }

    fn encode(item: &StoreItem) -> Result<Item, StoreError> {
        to_item(item).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(item: Item) -> Result<StoreItem, StoreError> {
        from_item(item).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Sorted-set entries under `key`, lowest score first.
    async fn scored_entries(&self, key: &str) -> Result<Vec<StoreItem>, StoreError> {
        let mut entries = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#k = :k")
                .expression_attribute_names("#k", "key")
                .expression_attribute_values(":k", AttributeValue::S(key.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let entry = Self::decode(item)?;
                if entry.member != VALUE_MEMBER && entry.score.is_some() {
                    entries.push(entry);
                }
            }

            match output.last_evaluated_key {
                Some(last_key) if !last_key.is_empty() => start_key = Some(last_key),
                _ => break,
            }
        }

        entries.sort_by(|a, b| {
            a.score
                .unwrap_or_default()
                .total_cmp(&b.score.unwrap_or_default())
                .then_with(|| a.member.cmp(&b.member))
        });
        Ok(entries)
    }

    async fn delete_item(&self, key: &str, member: &str) -> Result<Option<StoreItem>, StoreError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::item_key(key, member)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match output.attributes {
            Some(attributes) if !attributes.is_empty() => Ok(Some(Self::decode(attributes)?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl KeyValueStore for DynamoDbStore {
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let item = Self::encode(&StoreItem::scored(key, member, score))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self.delete_item(key, member).await?.is_some())
    }

    async fn sorted_set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .scored_entries(key)
            .await?
            .into_iter()
            .map(|entry| entry.member)
            .collect())
    }

    async fn sorted_set_rank(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError> {
        Ok(self
            .scored_entries(key)
            .await?
            .iter()
            .position(|entry| entry.member == member))
    }

    async fn sorted_set_len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.scored_entries(key).await?.len())
    }

    async fn pop_min_if_at_least(
        &self,
        key: &str,
        count: usize,
    ) -> Result<Vec<String>, StoreError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        // A cancelled transaction means another caller got to the chosen
        // members first. Only a fresh read showing fewer than `count` entries
        // ends the loop empty; the pairing engine's deadline bounds it in time.
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let entries = self.scored_entries(key).await?;
            if entries.len() < count {
                return Ok(Vec::new());
            }

            let chosen: Vec<String> = entries
                .into_iter()
                .take(count)
                .map(|entry| entry.member)
                .collect();

            // Each delete only succeeds if the member is still queued, so the
            // transaction removes all of them or none.
            let mut transact_items = Vec::with_capacity(chosen.len());
            for member in &chosen {
                let delete = Delete::builder()
                    .table_name(&self.table_name)
                    .set_key(Some(Self::item_key(key, member)))
                    .condition_expression("attribute_exists(#m)")
                    .expression_attribute_names("#m", "member")
                    .build()
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                transact_items.push(TransactWriteItem::builder().delete(delete).build());
            }

            let result = self
                .client
                .transact_write_items()
                .set_transact_items(Some(transact_items))
                .send()
                .await;

            match result {
                Ok(_) => return Ok(chosen),
                Err(e) => {
                    if let SdkError::ServiceError(service_err) = &e {
                        if service_err.err().is_transaction_canceled_exception() {
                            debug!(
                                "Conditional pop on {} lost a race (attempt {}), re-reading queue",
                                key, attempt
                            );
                            continue;
                        }
                    }
                    return Err(StoreError::Backend(e.to_string()));
                }
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::item_key(key, VALUE_MEMBER)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match output.item {
            Some(item) => {
                let entry = Self::decode(item)?;
                if entry.is_live(Utc::now().timestamp()) {
                    Ok(entry.value)
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let item = Self::encode(&StoreItem::value(key, value, ttl))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn set_many(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut transact_items = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let put = Put::builder()
                .table_name(&self.table_name)
                .set_item(Some(Self::encode(&StoreItem::value(key, value, ttl))?))
                .build()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            transact_items.push(TransactWriteItem::builder().put(put).build());
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .send()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Utc::now().timestamp();
        Ok(self
            .delete_item(key, VALUE_MEMBER)
            .await?
            .is_some_and(|old| old.is_live(now)))
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = Utc::now().timestamp();
        let mut keys = BTreeSet::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("begins_with(#k, :prefix)")
                .expression_attribute_names("#k", "key")
                .expression_attribute_values(":prefix", AttributeValue::S(prefix.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let entry = Self::decode(item)?;
                if entry.is_live(now) {
                    keys.insert(entry.key);
                }
            }

            match output.last_evaluated_key {
                Some(last_key) if !last_key.is_empty() => start_key = Some(last_key),
                _ => break,
            }
        }

        Ok(keys.into_iter().collect())
    }
}
