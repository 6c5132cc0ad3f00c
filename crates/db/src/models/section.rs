use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{
    answer_option::AnswerOption,
    question::{Question, QuestionWithOptions},
};

/// Partition of a survey's sections. Each phase keeps its own section order
/// and its own question numbering.
#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "survey_phase", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SurveyPhase {
    Screening,
    #[default]
    Main,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Section {
    pub id: Uuid,
    pub survey_id: Uuid,
    pub phase: SurveyPhase,
    pub title: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateSection {
    pub phase: SurveyPhase,
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateSection {
    pub title: String,
}

/// Section plus its questions in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SectionWithQuestions {
    #[serde(flatten)]
    #[ts(flatten)]
    pub section: Section,
    pub questions: Vec<QuestionWithOptions>,
}

impl std::ops::Deref for SectionWithQuestions {
    type Target = Section;
    fn deref(&self) -> &Self::Target {
        &self.section
    }
}

impl SectionWithQuestions {
    /// One phase's sections with question and option payloads attached,
    /// in presentation order.
    pub async fn load_phase(
        pool: &SqlitePool,
        survey_id: Uuid,
        phase: &SurveyPhase,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sections = Section::find_by_survey_and_phase(pool, survey_id, phase).await?;
        Self::attach(pool, survey_id, sections).await
    }

    /// Both phases, screening first.
    pub async fn load_survey(pool: &SqlitePool, survey_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let sections = Section::find_by_survey(pool, survey_id).await?;
        Self::attach(pool, survey_id, sections).await
    }

    async fn attach(
        pool: &SqlitePool,
        survey_id: Uuid,
        sections: Vec<Section>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let questions = Question::find_by_survey(pool, survey_id).await?;
        let options = AnswerOption::find_by_survey(pool, survey_id).await?;

        let mut options_by_question: HashMap<Uuid, Vec<AnswerOption>> = HashMap::new();
        for option in options {
            options_by_question
                .entry(option.question_id)
                .or_default()
                .push(option);
        }

        let mut questions_by_section: HashMap<Uuid, Vec<QuestionWithOptions>> = HashMap::new();
        for question in questions {
            let options = options_by_question.remove(&question.id).unwrap_or_default();
            questions_by_section
                .entry(question.section_id)
                .or_default()
                .push(QuestionWithOptions { question, options });
        }

        Ok(sections
            .into_iter()
            .map(|section| {
                let questions = questions_by_section.remove(&section.id).unwrap_or_default();
                SectionWithQuestions { section, questions }
            })
            .collect())
    }
}

impl Section {
    /// Insert at the end of the phase's section list.
    pub async fn create(
        pool: &SqlitePool,
        survey_id: Uuid,
        data: &CreateSection,
        section_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Section>(
            r#"INSERT INTO sections (id, survey_id, phase, title, position)
               VALUES (
                   $1, $2, $3, $4,
                   (SELECT COALESCE(MAX(position) + 1, 0)
                      FROM sections WHERE survey_id = $2 AND phase = $3)
               )
               RETURNING id, survey_id, phase, title, position, created_at, updated_at"#,
        )
        .bind(section_id)
        .bind(survey_id)
        .bind(&data.phase)
        .bind(&data.title)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Section>(
            r#"SELECT id, survey_id, phase, title, position, created_at, updated_at
               FROM sections
               WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_survey_and_phase(
        pool: &SqlitePool,
        survey_id: Uuid,
        phase: &SurveyPhase,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Section>(
            r#"SELECT id, survey_id, phase, title, position, created_at, updated_at
               FROM sections
               WHERE survey_id = $1 AND phase = $2
               ORDER BY position ASC"#,
        )
        .bind(survey_id)
        .bind(phase)
        .fetch_all(pool)
        .await
    }

    /// All sections of a survey, screening phase first.
    pub async fn find_by_survey(
        pool: &SqlitePool,
        survey_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Section>(
            r#"SELECT id, survey_id, phase, title, position, created_at, updated_at
               FROM sections
               WHERE survey_id = $1
               ORDER BY CASE phase WHEN 'screening' THEN 0 ELSE 1 END, position ASC"#,
        )
        .bind(survey_id)
        .fetch_all(pool)
        .await
    }

    pub async fn rename(pool: &SqlitePool, id: Uuid, title: String) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Section>(
            r#"UPDATE sections
               SET title = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, survey_id, phase, title, position, created_at, updated_at"#,
        )
        .bind(id)
        .bind(title)
        .fetch_one(pool)
        .await
    }

    pub async fn update_position<'e, E>(
        executor: E,
        id: Uuid,
        position: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE sections SET position = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(position)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM sections WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
