use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::collections::HashSet;
use std::time::Duration;

use crate::models::question::CompletedQuestionsResponse;
use crate::repositories::errors::upstream_errors::UpstreamError;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserHistoryRepository: Send + Sync {
    /// IDs of every question the user has already solved.
    async fn get_completed_questions(&self, user_id: &str)
        -> Result<HashSet<String>, UpstreamError>;
}

pub struct HttpUserHistoryRepository {
    client: Client,
    base_url: Url,
}

impl HttpUserHistoryRepository {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url).map_err(|e| {
            UpstreamError::InvalidParameters(format!("user service url {}: {}", base_url, e))
        })?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl UserHistoryRepository for HttpUserHistoryRepository {
    async fn get_completed_questions(
        &self,
        user_id: &str,
    ) -> Result<HashSet<String>, UpstreamError> {
        // Each segment is percent-encoded, so IDs containing '/', '?' or '#'
        // still address the right user.
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                UpstreamError::InvalidParameters(format!(
                    "user service url {} cannot take a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("users")
            .push(user_id)
            .push("completed-questions");

        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(UpstreamError::NotFound(format!("user {}", user_id)))
            }
            status if !status.is_success() => return Err(UpstreamError::Status(status.as_u16())),
            _ => {}
        }

        let body: CompletedQuestionsResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        Ok(body.data.into_iter().collect())
    }
}
