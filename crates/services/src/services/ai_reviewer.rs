//! Background AI review: model findings land as `ai`-typed review threads.

use db::models::{
    ai_review::{AiReviewStatus, SurveyAiReview},
    question::Question,
    thread::{CreateReviewThread, ReviewThread, ThreadType},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::claude::{ChatTurn, ClaudeClient, ClaudeError};

const AI_AUTHOR: &str = "ai-reviewer";

const REVIEW_SYSTEM: &str = "You are reviewing a market-research questionnaire for wording problems: \
     double-barrelled questions, leading phrasing, missing or overlapping answer \
     options, and screening logic that contradicts later questions. \
     Report only real issues. Output valid JSON only.";

#[derive(Debug, Error)]
pub enum AiReviewError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("claude api error: {0}")]
    Claude(#[from] ClaudeError),
    #[error("survey has no questions to review")]
    NoQuestions,
}

/// Findings payload expected back from the model. Questions are referenced
/// by id because numbering restarts per phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FindingsResponse {
    findings: Vec<Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Finding {
    question_id: String,
    message: String,
}

pub struct AiReviewerService {
    pool: SqlitePool,
    claude: ClaudeClient,
}

impl AiReviewerService {
    pub fn new(pool: SqlitePool) -> Result<Self, AiReviewError> {
        let claude = ClaudeClient::from_env()?;
        Ok(Self { pool, claude })
    }

    pub fn with_client(pool: SqlitePool, claude: ClaudeClient) -> Self {
        Self { pool, claude }
    }

    /// Create the status record and run the review in the background. The
    /// caller polls [`status`](Self::status) for completion.
    pub async fn start(&self, survey_id: Uuid) -> Result<SurveyAiReview, AiReviewError> {
        let record = SurveyAiReview::create(&self.pool, Uuid::new_v4(), survey_id).await?;

        info!(
            survey_id = %survey_id,
            ai_review_id = %record.id,
            "ai review queued"
        );

        let pool = self.pool.clone();
        let claude = self.claude.clone();
        let record_id = record.id;
        tokio::spawn(async move {
            let service = AiReviewerService::with_client(pool, claude);
            if let Err(e) = service.run(record_id, survey_id).await {
                error!(survey_id = %survey_id, error = %e, "ai review failed");
            }
        });

        Ok(record)
    }

    async fn run(&self, record_id: Uuid, survey_id: Uuid) -> Result<(), AiReviewError> {
        SurveyAiReview::update_status(&self.pool, record_id, AiReviewStatus::Analyzing, None)
            .await?;

        match self.review_questions(survey_id).await {
            Ok(created) => {
                info!(
                    survey_id = %survey_id,
                    thread_count = created,
                    "ai review completed"
                );
                SurveyAiReview::update_status(
                    &self.pool,
                    record_id,
                    AiReviewStatus::Completed,
                    None,
                )
                .await?;
                Ok(())
            }
            Err(e) => {
                SurveyAiReview::update_status(
                    &self.pool,
                    record_id,
                    AiReviewStatus::Failed,
                    Some(&e.to_string()),
                )
                .await?;
                Err(e)
            }
        }
    }

    async fn review_questions(&self, survey_id: Uuid) -> Result<usize, AiReviewError> {
        let questions = Question::find_by_survey(&self.pool, survey_id).await?;
        if questions.is_empty() {
            return Err(AiReviewError::NoQuestions);
        }

        let prompt = build_review_prompt(&questions);
        let response: FindingsResponse = self
            .claude
            .complete_json(Some(REVIEW_SYSTEM), &[ChatTurn::user(prompt)])
            .await?;

        let mut created = 0;
        for finding in response.findings {
            let Some(question) = Uuid::parse_str(&finding.question_id)
                .ok()
                .and_then(|id| questions.iter().find(|q| q.id == id))
            else {
                warn!(
                    question_id = %finding.question_id,
                    "ai finding references an unknown question, skipped"
                );
                continue;
            };

            let data = CreateReviewThread {
                question_id: question.id,
                message: finding.message,
                created_by: AI_AUTHOR.to_string(),
                thread_type: Some(ThreadType::Ai),
            };
            ReviewThread::create(&self.pool, survey_id, &data, Uuid::new_v4()).await?;
            created += 1;
        }

        Ok(created)
    }
}

fn build_review_prompt(questions: &[Question]) -> String {
    let listing = questions
        .iter()
        .map(|q| {
            let mut line = format!(
                "- id: {} | {} [{}] {}",
                q.id, q.question_number, q.question_type, q.text
            );
            if q.is_required {
                line.push_str(" (required)");
            }
            if let Some(condition) = q.respondent_condition.as_deref() {
                line.push_str(&format!(" [shown when: {condition}]"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Review the following questionnaire and report wording or logic issues.

## Questions
{listing}

## Output Format
Return ONLY valid JSON with this structure:
```json
{{
  "findings": [
    {{
      "question_id": "<id copied from the listing>",
      "message": "What the problem is and how to fix it"
    }}
  ]
}}
```

Reference questions by the exact id shown above. Return an empty findings
array when nothing needs attention."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_prompt_lists_questions_with_their_ids() {
        let id = Uuid::new_v4();
        let question = Question {
            id,
            section_id: Uuid::new_v4(),
            question_type: db::models::question::QuestionType::Sa,
            question_number: "Q1".to_string(),
            text: "How often do you buy coffee?".to_string(),
            is_fixed: false,
            is_required: true,
            respondent_condition: Some("Q0 = yes".to_string()),
            position: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let prompt = build_review_prompt(&[question]);
        assert!(prompt.contains(&format!("id: {id}")));
        assert!(prompt.contains("Q1 [SA] How often do you buy coffee? (required) [shown when: Q0 = yes]"));
        assert!(prompt.contains("findings"));
    }

    #[test]
    fn findings_payload_parses_from_model_json() {
        let json = r#"{"findings": [{"question_id": "7f3e9f9c-5c3e-4a0a-8b0e-0a9d2f6b1c2d", "message": "Leading wording."}]}"#;
        let parsed: FindingsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.findings.len(), 1);
        assert_eq!(
            parsed.findings[0].question_id,
            "7f3e9f9c-5c3e-4a0a-8b0e-0a9d2f6b1c2d"
        );
    }
}
