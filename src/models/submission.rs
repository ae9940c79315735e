// src/models/submission.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::attempt::StudentIdentity;

/// The chosen choice id, as the browser sends it.
///
/// Anything that is neither an integer nor a string (null, floats, bools,
/// a missing key) lands in `Other` so one odd entry never rejects the whole
/// submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Id(i64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for AnswerValue {
    fn default() -> Self {
        AnswerValue::Other(serde_json::Value::Null)
    }
}

impl AnswerValue {
    /// The choice id, if the value parses as one. Strings are read up to the
    /// first non-digit, so `"12abc"` is 12 and `"abc"` is nothing.
    pub fn choice_id(&self) -> Option<i64> {
        match self {
            AnswerValue::Id(id) => Some(*id),
            AnswerValue::Text(raw) => leading_integer(raw),
            AnswerValue::Other(serde_json::Value::Number(n)) => n
                .as_f64()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64),
            AnswerValue::Other(_) => None,
        }
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// One (question, choice) pair in a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    #[serde(rename = "questionId")]
    pub question_id: i64,
    #[serde(default)]
    pub answer: AnswerValue,
}

/// DTO for submitting one assignment's answers.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[serde(rename = "assignmentId", default)]
    #[validate(range(min = 1))]
    pub assignment_id: i64,

    #[serde(flatten)]
    #[validate(nested)]
    pub identity: StudentIdentity,

    /// Required, but may be empty.
    #[serde(default)]
    #[validate(required)]
    pub answers: Option<Vec<SubmittedAnswer>>,
}

/// Score for a single assignment; callers sum across assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub score: i64,
    pub total: i64,
}

/// One answer as listed for admins.
#[derive(Debug, Serialize, FromRow)]
pub struct AnswerRow {
    pub assignment: String,
    pub question: String,
    pub answer: Option<String>,
}

/// Row feeding the CSV export.
#[derive(Debug, FromRow)]
pub struct ExportRow {
    pub name: String,
    pub roll: String,
    pub college: String,
    pub assignment_name: String,
    pub question_text: String,
    pub qtype: String,
    pub answer_text: Option<String>,
    pub choice_label: Option<String>,
}

impl ExportRow {
    /// The label for resolvable multiple-choice answers, otherwise the raw
    /// stored answer.
    pub fn answer(&self) -> String {
        match (&self.choice_label, self.qtype.as_str()) {
            (Some(label), crate::models::question::MCQ) => label.clone(),
            _ => self.answer_text.clone().unwrap_or_default(),
        }
    }

    pub fn into_fields(self) -> Vec<String> {
        let answer = self.answer();
        vec![
            self.name,
            self.roll,
            self.college,
            self.assignment_name,
            self.question_text,
            answer,
        ]
    }
}
