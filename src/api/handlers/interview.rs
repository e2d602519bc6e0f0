use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::error::PortalError;
use crate::AppState;

const QUESTION_COUNT: usize = 5;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateQuestionsRequest {
    pub skills: Vec<String>,
    pub interest: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackRequest {
    pub answers: Vec<InterviewAnswer>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterviewAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn generate_questions(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<GenerateQuestionsRequest>,
) -> Result<Json<QuestionsResponse>, ApiError> {
    let skills: Vec<&str> = req
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let interest = req.interest.trim();

    if skills.is_empty() || interest.is_empty() {
        return Err(ApiError::bad_request("Skills and interest are required"));
    }

    let completion = state
        .completions
        .complete(&questions_prompt(&skills, interest))
        .await
        .map_err(PortalError::from)?;

    let questions = parse_questions(&completion);
    if questions.is_empty() {
        return Err(PortalError::Upstream("completion contained no questions".to_string()).into());
    }

    tracing::debug!(count = questions.len(), "Generated interview questions");
    Ok(Json(QuestionsResponse { questions }))
}

pub async fn generate_feedback(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    if req.answers.is_empty() {
        return Err(ApiError::bad_request("Answers array is required"));
    }

    let feedback = state
        .completions
        .complete(&feedback_prompt(&req.answers))
        .await
        .map_err(PortalError::from)?;

    Ok(Json(FeedbackResponse { feedback }))
}

// ============================================================================
// Helpers
// ============================================================================

fn questions_prompt(skills: &[&str], interest: &str) -> String {
    format!(
        "Generate {QUESTION_COUNT} technical interview questions for someone skilled in {} \
         and interested in {interest}. Provide only the questions in a bullet list format.",
        skills.join(", ")
    )
}

fn feedback_prompt(answers: &[InterviewAnswer]) -> String {
    let transcript = answers
        .iter()
        .map(|a| format!("Q: {}\nA: {}", a.question, a.answer))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Evaluate these interview answers and provide detailed feedback on strengths, \
         weaknesses, and improvement suggestions:\n\n{transcript}"
    )
}

/// One question per non-blank line, without list numbering or bullets.
fn parse_questions(completion: &str) -> Vec<String> {
    completion
        .lines()
        .map(strip_list_marker)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    let line = if digits > 0 {
        match line[digits..].strip_prefix('.').or_else(|| line[digits..].strip_prefix(')')) {
            Some(rest) => rest,
            None => line,
        }
    } else {
        line
    };

    let line = line.trim_start();
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
        .unwrap_or(line)
        .trim()
}
