use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;
use crate::therapy::{generate_question, progress, Action, TherapySession};
use crate::utils::timing::start_request_timer;

pub const COMPLETION_MESSAGE: &str = "Thank you for participating! Here are all your responses:";

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Responses {
    List(Vec<String>),
    Summary(String),
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
    pub progress: f64,
    pub responses: Responses,
    pub restart: bool,
}

/// Request detail for the timing log; the answer itself stays out of the logs.
fn describe_answer(answer: &str) -> String {
    format!("answer_chars={}", answer.chars().count())
}

pub async fn answer_question(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    let detail = describe_answer(&request.response);
    let mut timer = start_request_timer("POST /api/question", Some(&detail));
    let result = advance(&state, &session, &request.response).await;
    timer.observe(&result);
    result.map(Json)
}

async fn advance(
    state: &AppState,
    session: &Session,
    answer: &str,
) -> Result<QuestionResponse, AppError> {
    let mut therapy = TherapySession::load(session).await?;
    therapy.record_answer(answer);

    match therapy.next_action() {
        Action::Ask(question_number) => {
            let question =
                generate_question(&state.gateway, question_number, &therapy.history).await;
            therapy.record_question(&question);
            therapy.store(session).await?;
            Ok(QuestionResponse {
                question,
                progress: progress(therapy.question_number),
                responses: Responses::List(therapy.responses.clone()),
                restart: false,
            })
        }
        Action::Finish => {
            let last_response = therapy.responses.last().map(String::as_str).unwrap_or("");
            let final_advice = state.gateway.generate_reappraisal_text(last_response).await;
            let summary = therapy.summary(&final_advice);
            TherapySession::clear(session).await?;
            info!(
                "Session finished after {} response(s)",
                therapy.responses.len()
            );
            Ok(QuestionResponse {
                question: COMPLETION_MESSAGE.to_string(),
                progress: 100.0,
                responses: Responses::Summary(summary),
                restart: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockOpenAi, TestClient};
    use serde_json::json;

    #[tokio::test]
    async fn six_answers_walk_the_flow_and_reset() {
        let mock = MockOpenAi::start().await;
        mock.set_completion_text("What else?");
        let mut client = TestClient::new(&mock);

        let expected = [
            100.0 / 6.0,
            200.0 / 6.0,
            50.0,
            400.0 / 6.0,
            500.0 / 6.0,
        ];
        for (index, expected_progress) in expected.iter().enumerate() {
            let (status, body) = client
                .post_json("/api/question", json!({ "response": format!("answer {}", index + 1) }))
                .await;
            assert_eq!(status, 200);
            let progress = body["progress"].as_f64().unwrap_or_default();
            assert!((progress - expected_progress).abs() < 0.01, "round {index}: {progress}");
            assert_eq!(body["restart"], false);
            assert_eq!(
                body["question"],
                match index + 1 {
                    4 | 5 => format!(
                        "Question {}: Let's draw. Please use 'Visual Metaphor' on the right. What else?",
                        index + 1
                    ),
                    n => format!("Question {n}: What else?"),
                }
            );
            assert_eq!(body["responses"].as_array().map(Vec::len), Some(index + 1));
        }

        mock.set_completion_text("You did great!");
        let (status, body) = client
            .post_json("/api/question", json!({ "response": "answer 6" }))
            .await;
        assert_eq!(status, 200);
        assert_eq!(body["progress"].as_f64(), Some(100.0));
        assert_eq!(body["restart"], true);
        assert_eq!(body["question"], COMPLETION_MESSAGE);
        assert_eq!(
            body["responses"],
            "Response 1: answer 1\nResponse 2: answer 2\nResponse 3: answer 3\nResponse 4: answer 4\n\
             Response 5: answer 5\nResponse 6: answer 6\nFinal Advice: You did great!"
        );

        let last_prompt = mock
            .completion_requests()
            .last()
            .and_then(|request| request["prompt"].as_str().map(str::to_string))
            .unwrap_or_default();
        assert!(last_prompt.ends_with("less than three sentences: answer 6"));

        let (_, body) = client
            .post_json("/api/question", json!({ "response": "again" }))
            .await;
        assert_eq!(body["restart"], false);
        assert_eq!(body["responses"], json!(["again"]));
        let progress = body["progress"].as_f64().unwrap_or_default();
        assert!((progress - 100.0 / 6.0).abs() < 0.01);
    }

    #[test]
    fn timing_detail_carries_only_the_answer_length() {
        let detail = describe_answer("my secret worry about école");
        assert_eq!(detail, "answer_chars=27");
        assert!(!detail.contains("secret"));
    }

    #[tokio::test]
    async fn missing_response_field_counts_as_empty_answer() {
        let mock = MockOpenAi::start().await;
        let mut client = TestClient::new(&mock);

        let (status, body) = client.post_json("/api/question", json!({})).await;
        assert_eq!(status, 200);
        assert_eq!(body["responses"], json!([""]));
    }

    #[tokio::test]
    async fn separate_clients_do_not_share_progress() {
        let mock = MockOpenAi::start().await;
        let mut first = TestClient::new(&mock);
        let mut second = first.fresh_session();

        first.post_json("/api/question", json!({ "response": "a" })).await;
        first.post_json("/api/question", json!({ "response": "b" })).await;
        let (_, body) = second.post_json("/api/question", json!({ "response": "c" })).await;

        assert_eq!(body["responses"], json!(["c"]));
    }
}
