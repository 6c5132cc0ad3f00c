use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::answer_option::AnswerOption;

/// Question kind: single answer, multiple answer, numeric, free answer.
/// Stored lowercase, exposed uppercase on the wire.
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "question_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum QuestionType {
    #[default]
    Sa,
    Ma,
    Nu,
    Fa,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Question {
    pub id: Uuid,
    pub section_id: Uuid,
    pub question_type: QuestionType,
    /// Derived display code ("Q1".."Qn"); recomputed after every reorder.
    pub question_number: String,
    pub text: String,
    pub is_fixed: bool,
    pub is_required: bool,
    pub respondent_condition: Option<String>,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    #[ts(flatten)]
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

impl std::ops::Deref for QuestionWithOptions {
    type Target = Question;
    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateQuestion {
    pub question_type: Option<QuestionType>,
    pub text: String,
    pub is_fixed: Option<bool>,
    pub is_required: Option<bool>,
    pub respondent_condition: Option<String>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateQuestion {
    pub question_type: Option<QuestionType>,
    pub text: Option<String>,
    pub is_required: Option<bool>,
    pub respondent_condition: Option<String>,
    pub options: Option<Vec<String>>,
}

impl Question {
    /// Insert at the end of the section's question list.
    pub async fn create(
        pool: &SqlitePool,
        section_id: Uuid,
        data: &CreateQuestion,
        question_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let question_type = data.question_type.clone().unwrap_or_default();
        let is_fixed = data.is_fixed.unwrap_or(false);
        let is_required = data.is_required.unwrap_or(false);
        sqlx::query_as::<_, Question>(
            r#"INSERT INTO questions
                   (id, section_id, question_type, text, is_fixed, is_required,
                    respondent_condition, position)
               VALUES (
                   $1, $2, $3, $4, $5, $6, $7,
                   (SELECT COALESCE(MAX(position) + 1, 0)
                      FROM questions WHERE section_id = $2)
               )
               RETURNING id, section_id, question_type, question_number, text,
                         is_fixed, is_required, respondent_condition, position,
                         created_at, updated_at"#,
        )
        .bind(question_id)
        .bind(section_id)
        .bind(question_type)
        .bind(&data.text)
        .bind(is_fixed)
        .bind(is_required)
        .bind(&data.respondent_condition)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"SELECT id, section_id, question_type, question_number, text,
                      is_fixed, is_required, respondent_condition, position,
                      created_at, updated_at
               FROM questions
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_section(
        pool: &SqlitePool,
        section_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"SELECT id, section_id, question_type, question_number, text,
                      is_fixed, is_required, respondent_condition, position,
                      created_at, updated_at
               FROM questions
               WHERE section_id = $1
               ORDER BY position ASC"#,
        )
        .bind(section_id)
        .fetch_all(pool)
        .await
    }

    /// Section-major traversal over the whole survey: screening phase first,
    /// then section position, then question position.
    pub async fn find_by_survey(
        pool: &SqlitePool,
        survey_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"SELECT q.id, q.section_id, q.question_type, q.question_number, q.text,
                      q.is_fixed, q.is_required, q.respondent_condition, q.position,
                      q.created_at, q.updated_at
               FROM questions q
               JOIN sections s ON q.section_id = s.id
               WHERE s.survey_id = $1
               ORDER BY CASE s.phase WHEN 'screening' THEN 0 ELSE 1 END,
                        s.position ASC, q.position ASC"#,
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        question_type: QuestionType,
        text: String,
        is_required: bool,
        respondent_condition: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"UPDATE questions
               SET question_type = $2, text = $3, is_required = $4,
                   respondent_condition = $5, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, section_id, question_type, question_number, text,
                         is_fixed, is_required, respondent_condition, position,
                         created_at, updated_at"#,
        )
        .bind(id)
        .bind(question_type)
        .bind(text)
        .bind(is_required)
        .bind(respondent_condition)
        .fetch_one(pool)
        .await
    }

    /// Move a question to a (section, position) slot and stamp its derived
    /// number. Used by the ordering engine inside a transaction.
    pub async fn update_placement<'e, E>(
        executor: E,
        id: Uuid,
        section_id: Uuid,
        position: i64,
        question_number: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"UPDATE questions
               SET section_id = $2, position = $3, question_number = $4,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(section_id)
        .bind(position)
        .bind(question_number)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
