// src/models/question.rs

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::error::AppError;

/// The only question type accepted.
pub const MCQ: &str = "mcq";

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub assignment_id: i64,
    pub qtype: String,
    pub text: String,
}

/// Represents the 'choices' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub label: String,
    pub is_correct: bool,
}

/// Choice as shown to students (correctness stripped).
#[derive(Debug, Serialize)]
pub struct PublicChoice {
    pub id: i64,
    pub label: String,
}

/// DTO for sending a question to the client.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub qtype: String,
    pub text: String,
    pub choices: Vec<PublicChoice>,
}

/// One choice in a create request.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NewChoice {
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "truthy")]
    pub is_correct: bool,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[serde(rename = "assignmentId", default)]
    #[validate(range(min = 1))]
    pub assignment_id: i64,
    #[serde(default)]
    pub qtype: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[serde(default)]
    pub choices: Vec<NewChoice>,
}

impl CreateQuestionRequest {
    /// Trims labels, drops blank ones and enforces the single-correct rule.
    pub fn sanitized_choices(&self) -> Result<Vec<NewChoice>, AppError> {
        if self.qtype != MCQ {
            return Err(AppError::BadRequest(
                "Only MCQ questions are supported.".to_string(),
            ));
        }

        let choices: Vec<NewChoice> = self
            .choices
            .iter()
            .map(|c| NewChoice {
                label: c.label.trim().to_string(),
                is_correct: c.is_correct,
            })
            .filter(|c| !c.label.is_empty())
            .collect();

        if choices.len() < 2 {
            return Err(AppError::BadRequest(
                "MCQ needs at least two choices.".to_string(),
            ));
        }

        if choices.iter().filter(|c| c.is_correct).count() != 1 {
            return Err(AppError::BadRequest(
                "Exactly one choice must be marked correct.".to_string(),
            ));
        }

        Ok(choices)
    }
}

/// Loose truthiness as browsers send it: `true`, non-zero numbers, any
/// non-empty string (including "false" and "0"), arrays and objects are set.
/// `false`, `0`, `""` and null are not.
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
        serde_json::Value::Null => false,
    })
}
