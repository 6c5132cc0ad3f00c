//! Review thread listing, filtering, and status/reply mutations.

use std::collections::HashMap;

use chrono::Utc;
use db::models::{
    review::{CreateReview, Review},
    thread::{CreateReviewThread, ReviewThread, ThreadType, ThreadWithReviews},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use super::session::{MutationState, SessionRegistry};

#[derive(Debug, Error)]
pub enum ReviewThreadError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("thread not found")]
    ThreadNotFound,
}

/// Thread-type facet of the review filter bar.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Ai,
    Team,
}

/// Resolution facet of the review filter bar.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, EnumString, Display, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Unresolved,
    Resolved,
}

/// Pure projection over a thread list; never mutates the input.
pub fn filter_threads(
    threads: &[ThreadWithReviews],
    type_filter: &TypeFilter,
    status_filter: &StatusFilter,
) -> Vec<ThreadWithReviews> {
    threads
        .iter()
        .filter(|thread| match type_filter {
            TypeFilter::All => true,
            TypeFilter::Ai => thread.thread_type == ThreadType::Ai,
            TypeFilter::Team => thread.thread_type == ThreadType::Team,
        })
        .filter(|thread| match status_filter {
            StatusFilter::All => true,
            StatusFilter::Unresolved => !thread.is_completed,
            StatusFilter::Resolved => thread.is_completed,
        })
        .cloned()
        .collect()
}

/// Successful toggle response: the persisted thread plus the mutation state
/// the session overlay ended in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ThreadToggleView {
    #[serde(flatten)]
    #[ts(flatten)]
    pub thread: ReviewThread,
    pub mutation: MutationState,
}

#[derive(Clone)]
pub struct ReviewThreadService {
    pool: SqlitePool,
}

impl ReviewThreadService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Threads with their replies. A survey with no persisted review
    /// activity gets the fixed sample set so the review screen is never
    /// empty; samples are never written back.
    pub async fn list(&self, survey_id: Uuid) -> Result<Vec<ThreadWithReviews>, ReviewThreadError> {
        let threads = ReviewThread::find_by_survey(&self.pool, survey_id).await?;
        if threads.is_empty() {
            return Ok(sample_threads(survey_id));
        }

        let reviews = Review::find_by_survey(&self.pool, survey_id).await?;
        let mut by_thread: HashMap<Uuid, Vec<Review>> = HashMap::new();
        for review in reviews {
            by_thread.entry(review.thread_id).or_default().push(review);
        }

        Ok(threads
            .into_iter()
            .map(|thread| {
                let reviews = by_thread.remove(&thread.id).unwrap_or_default();
                ThreadWithReviews { thread, reviews }
            })
            .collect())
    }

    pub async fn create(
        &self,
        survey_id: Uuid,
        data: &CreateReviewThread,
    ) -> Result<ReviewThread, ReviewThreadError> {
        Ok(ReviewThread::create(&self.pool, survey_id, data, Uuid::new_v4()).await?)
    }

    /// Optimistic status flip through the session overlay: the local value
    /// flips first, then the write runs; a failed write reverts the overlay
    /// to the last committed value and surfaces the error.
    pub async fn toggle_status(
        &self,
        sessions: &SessionRegistry,
        thread_id: Uuid,
    ) -> Result<ThreadToggleView, ReviewThreadError> {
        let thread = ReviewThread::find_by_id(&self.pool, thread_id)
            .await?
            .ok_or(ReviewThreadError::ThreadNotFound)?;
        let survey_id = thread.survey_id;

        let local = sessions.with(survey_id, |session| {
            session.begin_toggle(thread_id, thread.is_completed)
        });

        match ReviewThread::set_completed(&self.pool, thread_id, local).await {
            Ok(updated) => {
                sessions.with(survey_id, |session| session.commit_toggle(thread_id));
                Ok(ThreadToggleView {
                    thread: updated,
                    mutation: MutationState::Committed,
                })
            }
            Err(err) => {
                sessions.with(survey_id, |session| session.fail_toggle(thread_id));
                warn!(
                    thread_id = %thread_id,
                    error = %err,
                    "thread status toggle failed, reverted to last committed value"
                );
                Err(ReviewThreadError::Database(err))
            }
        }
    }

    /// Append a reply. Reviews are append-only; insertion order is
    /// chronological order.
    pub async fn append_review(
        &self,
        thread_id: Uuid,
        data: &CreateReview,
    ) -> Result<Review, ReviewThreadError> {
        ReviewThread::find_by_id(&self.pool, thread_id)
            .await?
            .ok_or(ReviewThreadError::ThreadNotFound)?;
        Ok(Review::create(&self.pool, thread_id, data, Uuid::new_v4()).await?)
    }
}

/// Fixed sample set shown while a survey has no review activity of its own:
/// two ai threads and two team threads, one of each unresolved.
pub fn sample_threads(survey_id: Uuid) -> Vec<ThreadWithReviews> {
    let now = Utc::now();
    let sample = |thread_type: ThreadType, created_by: &str, message: &str, is_completed: bool| {
        ThreadWithReviews {
            thread: ReviewThread {
                id: Uuid::new_v4(),
                survey_id,
                question_id: Uuid::new_v4(),
                thread_type,
                created_by: created_by.to_string(),
                message: message.to_string(),
                is_completed,
                created_at: now,
                updated_at: now,
            },
            reviews: Vec::new(),
        }
    };

    vec![
        sample(
            ThreadType::Ai,
            "ai-reviewer",
            "Q2 asks about two things at once; consider splitting it into separate questions.",
            false,
        ),
        sample(
            ThreadType::Ai,
            "ai-reviewer",
            "The screening question wording may prime respondents toward a positive answer.",
            true,
        ),
        sample(
            ThreadType::Team,
            "reviewer",
            "Should the age bands here match the ones we used in the last wave?",
            false,
        ),
        sample(
            ThreadType::Team,
            "reviewer",
            "Typo in the intro text of the main section.",
            true,
        ),
    ]
}
