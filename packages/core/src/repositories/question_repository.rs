use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::models::question::Question;
use crate::repositories::errors::upstream_errors::UpstreamError;

#[async_trait]
pub trait QuestionCatalogRepository: Send + Sync {
    /// A sample of up to `sample_size` questions of the given difficulty.
    /// The catalog filters on a single tag; `None` leaves the tag unconstrained.
    async fn get_questions(
        &self,
        difficulty: &str,
        tag: Option<&str>,
        sample_size: usize,
    ) -> Result<Vec<Question>, UpstreamError>;
}

pub struct HttpQuestionCatalogRepository {
    client: Client,
    base_url: String,
}

impl HttpQuestionCatalogRepository {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuestionCatalogRepository for HttpQuestionCatalogRepository {
    async fn get_questions(
        &self,
        difficulty: &str,
        tag: Option<&str>,
        sample_size: usize,
    ) -> Result<Vec<Question>, UpstreamError> {
        let url = format!("{}/questions", self.base_url);

        let mut params = vec![("difficulty", difficulty.to_string())];
        if let Some(tag) = tag {
            params.push(("tag", tag.to_string()));
        }
        params.push(("size", sample_size.to_string()));

        let response = self.client.get(&url).query(&params).send().await?;

        match response.status() {
            StatusCode::BAD_REQUEST => {
                return Err(UpstreamError::InvalidParameters(format!(
                    "difficulty={}, tag={}",
                    difficulty,
                    tag.unwrap_or("")
                )))
            }
            status if !status.is_success() => return Err(UpstreamError::Status(status.as_u16())),
            _ => {}
        }

        response
            .json::<Vec<Question>>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}
