use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Choice attached to a single question. Owned exclusively by that question
/// and deleted with it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AnswerOption {
    pub id: Uuid,
    pub question_id: Uuid,
    pub label: String,
    pub position: i64,
}

impl AnswerOption {
    pub async fn find_by_question(
        pool: &SqlitePool,
        question_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AnswerOption>(
            r#"SELECT id, question_id, label, position
               FROM answer_options
               WHERE question_id = $1
               ORDER BY position ASC"#,
        )
        .bind(question_id)
        .fetch_all(pool)
        .await
    }

    /// All options for a survey's questions, in question order.
    pub async fn find_by_survey(
        pool: &SqlitePool,
        survey_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AnswerOption>(
            r#"SELECT o.id, o.question_id, o.label, o.position
               FROM answer_options o
               JOIN questions q ON o.question_id = q.id
               JOIN sections s ON q.section_id = s.id
               WHERE s.survey_id = $1
               ORDER BY o.question_id ASC, o.position ASC"#,
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }

    /// Replace a question's option list wholesale, preserving label order.
    pub async fn replace_for_question(
        pool: &SqlitePool,
        question_id: Uuid,
        labels: &[String],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM answer_options WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        for (position, label) in labels.iter().enumerate() {
            sqlx::query(
                "INSERT INTO answer_options (id, question_id, label, position) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(question_id)
            .bind(label)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Self::find_by_question(pool, question_id).await
    }
}
