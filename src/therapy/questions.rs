use crate::llm::{AiGateway, Completion};
use crate::therapy::session::{Speaker, Turn};

pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 6;

pub const RESTART_PROMPT: &str = "Do you want to restart the session?";
pub const QUESTION_FALLBACK: &str =
    "Can you tell me a little more about how you are feeling right now?";

const DRAWING_LEAD_IN: &str = "Let's draw. Please use 'Visual Metaphor' on the right.";
const CLOSING_LEAD_IN: &str =
    "Thank you for participating in the session. You can restart the session if you want to explore more.";

#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub number: u8,
    pub instruction: &'static str,
    pub lead_in: Option<&'static str>,
}

pub const STEPS: [Step; 6] = [
    Step {
        number: 1,
        instruction: "Generate a question to ask user (children) about their current emotion. Do not use 'kiddo'.",
        lead_in: None,
    },
    Step {
        number: 2,
        instruction: "Based on the previous responses, generate a short question for identifying and describing the emotion, such as asking about the intensity of the emotion or where in the body it is felt the most. Users are kids, so please use easy and friendly expressions.",
        lead_in: None,
    },
    Step {
        number: 3,
        instruction: "Based on the previous responses, generate a short question that explores the context, such as asking what triggered this emotion or describing the situation or thought that led to these feelings. Users are kids, so please use easy and friendly expressions.",
        lead_in: None,
    },
    Step {
        number: 4,
        instruction: "Based on the previous responses, generate a short question that asks the user to describe and visualize their emotion as an 'abstract shape or symbol' to create their own metaphor for their mind. Users are kids, so please use easy and friendly expressions, and provide some metaphors or examples.",
        lead_in: Some(DRAWING_LEAD_IN),
    },
    Step {
        number: 5,
        instruction: "Based on the previous responses, generate a short question that asks the user to describe and visualize their emotions as a 'texture' to create their own metaphor for their mind. Users are kids, so please use easy and friendly expressions, and provide some metaphors or examples.",
        lead_in: Some(DRAWING_LEAD_IN),
    },
    Step {
        number: 6,
        instruction: "Based on the previous responses, provide personalized cognitive reappraisal advice to help think about the situation that user described in the previous response in a more positive way. Or, if user's previous response was already positive, please assist user to think about the good things they might learn from this experience. Please incorporating a playful and engaging approach consistent with CBT theory. Make sure the advice is directly relevant to the emotions and situations described by the child, using examples or activities that are fun and easy for kids to understand. Also, make this less than three sentences.",
        lead_in: Some(CLOSING_LEAD_IN),
    },
];

pub fn step(number: u8) -> Option<&'static Step> {
    if (FIRST_STEP..=LAST_STEP).contains(&number) {
        STEPS.get(usize::from(number - FIRST_STEP))
    } else {
        None
    }
}

fn question_context(history: &[Turn]) -> String {
    let answers: Vec<&str> = history
        .iter()
        .filter(|turn| turn.speaker == Speaker::You)
        .map(|turn| turn.text.as_str())
        .collect();
    format!("Based on the user's previous responses: {}", answers.join(" "))
}

pub fn build_question_prompt(step: &Step, history: &[Turn]) -> String {
    format!("{} {}", question_context(history), step.instruction)
}

pub fn format_question(step: &Step, body: &str) -> String {
    match step.lead_in {
        Some(lead_in) => format!("Question {}: {} {}", step.number, lead_in, body),
        None => format!("Question {}: {}", step.number, body),
    }
}

/// Asks the completion model for the question of step `question_number`.
///
/// Numbers outside the six steps return the restart prompt without calling the model.
pub async fn generate_question(
    gateway: &AiGateway,
    question_number: u8,
    history: &[Turn],
) -> String {
    let Some(step) = step(question_number) else {
        return RESTART_PROMPT.to_string();
    };

    let prompt = build_question_prompt(step, history);
    let body = match gateway.complete(&prompt, gateway.question_params()).await {
        Completion::Text(text) if !text.is_empty() => text,
        _ => QUESTION_FALLBACK.to_string(),
    };
    format_question(step, &body)
}

/// Percentage of the six steps reported to the page for `question_number`.
pub fn progress(question_number: u8) -> f64 {
    let completed = question_number.saturating_sub(FIRST_STEP).min(LAST_STEP);
    f64::from(completed) / f64::from(LAST_STEP) * 100.0
}
