use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::section::{SectionWithQuestions, SurveyPhase};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateSurvey {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct UpdateSurvey {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Full editing payload: the survey plus both phase trees.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SurveyWithSections {
    #[serde(flatten)]
    #[ts(flatten)]
    pub survey: Survey,
    pub screening: Vec<SectionWithQuestions>,
    pub main: Vec<SectionWithQuestions>,
}

impl std::ops::Deref for SurveyWithSections {
    type Target = Survey;
    fn deref(&self) -> &Self::Target {
        &self.survey
    }
}

impl SurveyWithSections {
    pub async fn load(pool: &SqlitePool, survey: Survey) -> Result<Self, sqlx::Error> {
        let sections = SectionWithQuestions::load_survey(pool, survey.id).await?;
        let (screening, main) = sections
            .into_iter()
            .partition(|section| section.phase == SurveyPhase::Screening);
        Ok(Self {
            survey,
            screening,
            main,
        })
    }
}

impl Survey {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateSurvey,
        survey_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Survey>(
            r#"INSERT INTO surveys (id, title, description)
               VALUES ($1, $2, $3)
               RETURNING id, title, description, created_at, updated_at"#,
        )
        .bind(survey_id)
        .bind(&data.title)
        .bind(&data.description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Survey>(
            "SELECT id, title, description, created_at, updated_at FROM surveys WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Survey>(
            "SELECT id, title, description, created_at, updated_at
             FROM surveys
             ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        title: String,
        description: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Survey>(
            r#"UPDATE surveys
               SET title = $2, description = $3, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING id, title, description, created_at, updated_at"#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM surveys WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
