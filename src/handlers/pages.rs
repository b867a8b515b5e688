use axum::extract::State;
use axum::response::Html;
use tower_sessions::Session;

use crate::error::AppError;
use crate::state::AppState;
use crate::therapy::{generate_question, progress, TherapySession};
use crate::utils::timing::start_request_timer;

pub async fn home(State(state): State<AppState>, session: Session) -> Result<Html<String>, AppError> {
    let mut timer = start_request_timer("GET /", None);
    let result = render_home(&state, &session).await;
    timer.observe(&result);
    result
}

async fn render_home(state: &AppState, session: &Session) -> Result<Html<String>, AppError> {
    let mut therapy = TherapySession::load(session).await?;

    // A reload re-shows the unanswered question instead of skipping ahead.
    let latest_question = match therapy.pending_question() {
        Some(question) => question.to_string(),
        None => {
            let question =
                generate_question(&state.gateway, therapy.question_number, &therapy.history).await;
            therapy.record_question(&question);
            therapy.store(session).await?;
            question
        }
    };

    let progress_value = progress(therapy.question_number).to_string();
    let page = state.templates.index(&latest_question, &progress_value)?;
    Ok(Html(page))
}

pub async fn reflection(
    State(state): State<AppState>,
    session: Session,
) -> Result<Html<String>, AppError> {
    let mut timer = start_request_timer("GET /reflection", None);
    let result = render_reflection(&state, &session).await;
    timer.observe(&result);
    result
}

async fn render_reflection(state: &AppState, session: &Session) -> Result<Html<String>, AppError> {
    let therapy = TherapySession::load(session).await?;
    let page = state.templates.reflection(&therapy.numbered_responses())?;
    Ok(Html(page))
}
