// src/handlers/assignment.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    error::AppError,
    models::{
        assignment::Assignment,
        question::{Choice, MCQ, PublicChoice, PublicQuestion, Question},
    },
};

/// Lists all assignments in the order students take them.
pub async fn list_assignments(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let assignments = sqlx::query_as::<_, Assignment>(
        "SELECT id, name, audio_path, created_at FROM assignments ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list assignments: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(assignments))
}

/// Query parameters for listing questions.
#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    #[serde(rename = "assignmentId")]
    pub assignment_id: Option<String>,
}

/// Lists an assignment's questions with their choices, without revealing
/// which choice is correct.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let assignment_id = params
        .assignment_id
        .as_deref()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("assignmentId required".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, assignment_id, qtype, text
        FROM questions
        WHERE assignment_id = ? AND qtype = ?
        ORDER BY id ASC
        "#,
    )
    .bind(assignment_id)
    .bind(MCQ)
    .fetch_all(&pool)
    .await?;

    if questions.is_empty() {
        return Ok(Json(Vec::new()));
    }

    // Dynamic IN clause for all choices at once
    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, question_id, label, is_correct FROM choices WHERE question_id IN (",
    );
    let mut separated = query_builder.separated(",");
    for q in &questions {
        separated.push_bind(q.id);
    }
    separated.push_unseparated(") ORDER BY id ASC");

    let choices: Vec<Choice> = query_builder.build_query_as().fetch_all(&pool).await?;

    let mut by_question: HashMap<i64, Vec<PublicChoice>> = HashMap::new();
    for c in choices {
        by_question.entry(c.question_id).or_default().push(PublicChoice {
            id: c.id,
            label: c.label,
        });
    }

    let public: Vec<PublicQuestion> = questions
        .into_iter()
        .map(|q| PublicQuestion {
            choices: by_question.remove(&q.id).unwrap_or_default(),
            id: q.id,
            qtype: q.qtype,
            text: q.text,
        })
        .collect();

    Ok(Json(public))
}
