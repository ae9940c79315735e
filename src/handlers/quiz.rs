// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::Attempt,
        submission::{ScoreResponse, SubmitRequest, SubmittedAnswer},
    },
};

/// Helper struct for fetching answer keys from the database.
#[derive(sqlx::FromRow)]
struct AnswerKey {
    question_id: i64,
    correct_choice_id: Option<i64>,
}

/// One answer ready to be written to `submissions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub answer_text: String,
    pub is_correct: bool,
}

/// Grades submitted answers against the assignment's answer key.
///
/// `key` maps every question of the assignment to its correct choice.
/// Answers for questions outside the key are dropped and do not count
/// towards `total`; unanswered questions are simply absent.
pub fn grade_answers(
    key: &HashMap<i64, Option<i64>>,
    answers: &[SubmittedAnswer],
) -> (Vec<GradedAnswer>, ScoreResponse) {
    let mut graded = Vec::new();
    let mut result = ScoreResponse::default();

    for answer in answers {
        let Some(correct) = key.get(&answer.question_id) else {
            continue;
        };

        let chosen = answer.answer.choice_id();
        let is_correct = chosen.is_some() && chosen == *correct;

        result.total += 1;
        if is_correct {
            result.score += 1;
        }

        graded.push(GradedAnswer {
            question_id: answer.question_id,
            answer_text: chosen.map(|id| id.to_string()).unwrap_or_default(),
            is_correct,
        });
    }

    (graded, result)
}

/// Scores one assignment for a student.
///
/// * Writes one `submissions` row per counted answer.
/// * Overwrites the attempt's `score`/`total` with this call's result.
/// * Returns `{score, total}` for this assignment only.
pub async fn submit_answers(
    State(pool): State<SqlitePool>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|_| AppError::BadRequest("Missing fields.".to_string()))?;
    let answers = req.answers.unwrap_or_default();

    let attempt = Attempt::find_for(&pool, req.assignment_id, &req.identity)
        .await?
        .ok_or(AppError::NotRegistered)?;

    let keys: Vec<AnswerKey> = sqlx::query_as(
        r#"
        SELECT q.id AS question_id, c.id AS correct_choice_id
        FROM questions q
        LEFT JOIN choices c ON c.question_id = q.id AND c.is_correct = 1
        WHERE q.assignment_id = ? AND q.qtype = 'mcq'
        ORDER BY q.id ASC, c.id ASC
        "#,
    )
    .bind(req.assignment_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load answer key: {:?}", e);
        AppError::from(e)
    })?;

    if keys.is_empty() {
        return Ok(Json(ScoreResponse::default()));
    }

    let mut key: HashMap<i64, Option<i64>> = HashMap::new();
    for k in keys {
        let entry = key.entry(k.question_id).or_insert(None);
        if entry.is_none() {
            *entry = k.correct_choice_id;
        }
    }

    let (graded, result) = grade_answers(&key, &answers);

    let mut tx = pool.begin().await?;

    for answer in &graded {
        sqlx::query(
            "INSERT INTO submissions (attempt_id, question_id, answer_text, is_correct) VALUES (?, ?, ?, ?)",
        )
        .bind(attempt.id)
        .bind(answer.question_id)
        .bind(&answer.answer_text)
        .bind(answer.is_correct)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE attempts SET score = ?, total = ? WHERE id = ?")
        .bind(result.score)
        .bind(result.total)
        .bind(attempt.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        attempt_id = attempt.id,
        score = result.score,
        total = result.total,
        "Answers submitted"
    );

    Ok(Json(result))
}
