//! Chat panel backend: survey-aware assistant replies.
//!
//! With ANTHROPIC_API_KEY set the panel talks to the live model; without it
//! the service degrades to a canned suggestion after a short simulated
//! thinking pause, so the editor stays usable in development.

use std::time::Duration;

use db::models::section::SectionWithQuestions;
use thiserror::Error;
use tracing::debug;

use super::claude::{ChatTurn, ClaudeClient, ClaudeError};
use super::session::{ChatMessage, ChatRole};

/// Simulated thinking pause before a canned reply.
const THINKING_DELAY: Duration = Duration::from_millis(1200);

const SYSTEM_PROMPT: &str = "You are a survey-design assistant embedded in a questionnaire editor. \
     Help the author improve question wording, answer options, screening logic, and flow. \
     Be concrete and concise; refer to questions by their number (Q1, Q2, ...). \
     The current survey content follows.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("claude api error: {0}")]
    Claude(#[from] ClaudeError),
}

#[derive(Clone, Default)]
pub struct AssistantService {
    claude: Option<ClaudeClient>,
}

impl AssistantService {
    /// Live model when the API key is configured, canned replies otherwise.
    pub fn from_env() -> Self {
        match ClaudeClient::from_env() {
            Ok(client) => Self {
                claude: Some(client),
            },
            Err(_) => {
                debug!("ANTHROPIC_API_KEY not set, assistant replies are canned");
                Self { claude: None }
            }
        }
    }

    pub fn canned() -> Self {
        Self { claude: None }
    }

    pub async fn reply(
        &self,
        survey_title: &str,
        sections: &[SectionWithQuestions],
        transcript: &[ChatMessage],
    ) -> Result<String, AssistantError> {
        match &self.claude {
            Some(client) => {
                let system = format!(
                    "{SYSTEM_PROMPT}\n\n{}",
                    summarize_survey(survey_title, sections)
                );
                let turns: Vec<ChatTurn> = transcript
                    .iter()
                    .map(|message| match message.role {
                        ChatRole::User => ChatTurn::user(message.content.clone()),
                        ChatRole::Assistant => ChatTurn::assistant(message.content.clone()),
                    })
                    .collect();
                Ok(client.complete(Some(&system), &turns).await?)
            }
            None => {
                tokio::time::sleep(THINKING_DELAY).await;
                Ok(canned_reply(sections))
            }
        }
    }
}

fn summarize_survey(survey_title: &str, sections: &[SectionWithQuestions]) -> String {
    let mut out = format!("# {survey_title}\n");
    for section in sections {
        out.push_str(&format!("\n## {} ({})\n", section.title, section.phase));
        for question in &section.questions {
            out.push_str(&format!(
                "- {} [{}]{} {}\n",
                question.question_number,
                question.question_type,
                if question.is_required {
                    " (required)"
                } else {
                    ""
                },
                question.text
            ));
        }
    }
    out
}

fn canned_reply(sections: &[SectionWithQuestions]) -> String {
    let question_count: usize = sections.iter().map(|s| s.questions.len()).sum();
    if question_count == 0 {
        return "The survey has no questions yet. Start with a short screening section \
                to qualify respondents, then group the main questions by topic."
            .to_string();
    }
    format!(
        "I looked over the {question_count} questions currently in the survey. \
         A few things worth checking: make sure every multiple-answer question has \
         an exhaustive option list, that required flags match what analysis needs, \
         and that screening questions come before anything they gate."
    )
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn canned_reply_arrives_after_the_thinking_pause() {
        let service = AssistantService::canned();
        let transcript = vec![ChatMessage {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: "Does the flow look right?".to_string(),
            created_at: chrono::Utc::now(),
        }];

        let reply = service.reply("Brand tracker", &[], &transcript).await.unwrap();
        assert!(reply.contains("no questions yet"));
    }
}
