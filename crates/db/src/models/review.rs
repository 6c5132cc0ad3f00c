use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Reply appended to a review thread. Append-only: there is intentionally no
/// update or delete statement for this table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Review {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub message: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateReview {
    pub message: String,
    pub created_by: String,
}

impl Review {
    pub async fn create(
        pool: &SqlitePool,
        thread_id: Uuid,
        data: &CreateReview,
        review_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"INSERT INTO reviews (id, thread_id, message, created_by)
               VALUES ($1, $2, $3, $4)
               RETURNING id, thread_id, message, created_by, created_at"#,
        )
        .bind(review_id)
        .bind(thread_id)
        .bind(&data.message)
        .bind(&data.created_by)
        .fetch_one(pool)
        .await
    }

    /// All replies for a survey's threads, in insertion order per thread.
    pub async fn find_by_survey(
        pool: &SqlitePool,
        survey_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Review>(
            r#"SELECT r.id, r.thread_id, r.message, r.created_by, r.created_at
               FROM reviews r
               JOIN review_threads t ON r.thread_id = t.id
               WHERE t.survey_id = $1
               ORDER BY r.created_at ASC, r.rowid ASC"#,
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }
}
