use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::AppError;
use crate::therapy::questions::{FIRST_STEP, LAST_STEP};

const SESSION_KEY: &str = "therapy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    You,
    Therapist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// What the next answer round does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Ask(u8),
    Finish,
}

/// Per-client progress through the question flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TherapySession {
    pub history: Vec<Turn>,
    pub responses: Vec<String>,
    pub question_number: u8,
}

impl Default for TherapySession {
    fn default() -> Self {
        TherapySession {
            history: Vec::new(),
            responses: Vec::new(),
            question_number: FIRST_STEP,
        }
    }
}

impl TherapySession {
    pub async fn load(session: &Session) -> Result<Self, AppError> {
        Ok(session
            .get::<TherapySession>(SESSION_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn store(&self, session: &Session) -> Result<(), AppError> {
        session.insert(SESSION_KEY, self).await?;
        Ok(())
    }

    /// Drops every stored value and the session record itself.
    pub async fn clear(session: &Session) -> Result<(), AppError> {
        session.flush().await?;
        Ok(())
    }

    pub fn record_answer(&mut self, answer: &str) {
        self.history.push(Turn {
            speaker: Speaker::You,
            text: answer.to_string(),
        });
        self.responses.push(answer.to_string());
    }

    pub fn next_action(&self) -> Action {
        if self.question_number < LAST_STEP {
            Action::Ask(self.question_number)
        } else {
            Action::Finish
        }
    }

    /// Stores an asked question and moves to the next step.
    pub fn record_question(&mut self, question: &str) {
        self.history.push(Turn {
            speaker: Speaker::Therapist,
            text: question.to_string(),
        });
        self.question_number = self.question_number.saturating_add(1).min(LAST_STEP + 1);
    }

    /// The question still waiting for an answer, if the last turn was one.
    pub fn pending_question(&self) -> Option<&str> {
        self.history
            .last()
            .filter(|turn| turn.speaker == Speaker::Therapist)
            .map(|turn| turn.text.as_str())
    }

    pub fn numbered_responses(&self) -> Vec<String> {
        self.responses
            .iter()
            .enumerate()
            .map(|(index, response)| format!("Response {}: {}", index + 1, response))
            .collect()
    }

    pub fn summary(&self, final_advice: &str) -> String {
        format!(
            "{}\nFinal Advice: {}",
            self.numbered_responses().join("\n"),
            final_advice
        )
    }
}
