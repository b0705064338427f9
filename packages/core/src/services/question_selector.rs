use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::repositories::question_repository::QuestionCatalogRepository;
use crate::repositories::user_history_repository::UserHistoryRepository;

/// Catalog sample sizes, tried smallest first.
pub const DEFAULT_SAMPLE_SIZES: [usize; 3] = [10, 50, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionPass {
    /// Neither user has solved the question.
    Fresh,
    /// At most one of the users has solved it.
    AllowRepeat,
}

impl SelectionPass {
    fn accepts(
        self,
        question_id: &str,
        first_completed: &HashSet<String>,
        second_completed: &HashSet<String>,
    ) -> bool {
        let first = first_completed.contains(question_id);
        let second = second_completed.contains(question_id);
        match self {
            SelectionPass::Fresh => !first && !second,
            SelectionPass::AllowRepeat => !(first && second),
        }
    }
}

/// Picks a question acceptable to both users of a pair.
///
/// Upstream failures never fail the selection: a missing history counts as
/// "nothing solved" and a failed catalog call moves on to the next sample size.
#[derive(Clone)]
pub struct QuestionSelector {
    history: Arc<dyn UserHistoryRepository>,
    catalog: Arc<dyn QuestionCatalogRepository>,
    sample_sizes: Vec<usize>,
}

impl QuestionSelector {
    pub fn new(
        history: Arc<dyn UserHistoryRepository>,
        catalog: Arc<dyn QuestionCatalogRepository>,
    ) -> Self {
        Self::with_sample_sizes(history, catalog, DEFAULT_SAMPLE_SIZES.to_vec())
    }

    pub fn with_sample_sizes(
        history: Arc<dyn UserHistoryRepository>,
        catalog: Arc<dyn QuestionCatalogRepository>,
        sample_sizes: Vec<usize>,
    ) -> Self {
        QuestionSelector {
            history,
            catalog,
            sample_sizes,
        }
    }

    /// Returns a question ID, or `None` when no sampled candidate is acceptable.
    ///
    /// Only the first topic is sent to the catalog, which filters on a single tag.
    pub async fn select_question(
        &self,
        first_user_id: &str,
        second_user_id: &str,
        topics: &[String],
        difficulty: &str,
    ) -> Option<String> {
        let (first_completed, second_completed) = tokio::join!(
            self.completed_or_empty(first_user_id),
            self.completed_or_empty(second_user_id)
        );
        let tag = topics.first().map(String::as_str);

        for pass in [SelectionPass::Fresh, SelectionPass::AllowRepeat] {
            for &sample_size in &self.sample_sizes {
                let candidates = match self
                    .catalog
                    .get_questions(difficulty, tag, sample_size)
                    .await
                {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        warn!(
                            "Question catalog failed for difficulty={} tag={:?} size={}: {}",
                            difficulty, tag, sample_size, e
                        );
                        continue;
                    }
                };

                if let Some(question) = candidates
                    .into_iter()
                    .find(|q| pass.accepts(&q.id, &first_completed, &second_completed))
                {
                    info!(
                        "Selected question {} for {} and {} ({:?} pass, sample size {})",
                        question.id, first_user_id, second_user_id, pass, sample_size
                    );
                    return Some(question.id);
                }

                debug!(
                    "No acceptable question in sample of {} ({:?} pass)",
                    sample_size, pass
                );
            }
        }

        None
    }

    async fn completed_or_empty(&self, user_id: &str) -> HashSet<String> {
        match self.history.get_completed_questions(user_id).await {
            Ok(completed) => completed,
            Err(e) => {
                warn!(
                    "Could not fetch completed questions for {}, assuming none: {}",
                    user_id, e
                );
                HashSet::new()
            }
        }
    }
}
