// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Multipart, Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::DEFAULT_ASSIGNMENT_NAME,
    error::AppError,
    models::{
        assignment::CreatedAssignment,
        attempt::{RegistrantSummary, StudentIdentity},
        question::{CreateQuestionRequest, MCQ},
        submission::{AnswerRow, ExportRow},
    },
    state::AppState,
    utils::{csv, jwt::sign_admin_token, secret::secret_matches, storage::AudioStore},
};

/// Column order of the results export.
const EXPORT_HEADER: [&str; 6] = ["Name", "Roll", "College", "Assignment", "Question", "Answer"];

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub password: String,
}

/// Checks the shared admin password and hands out a bearer token for the
/// admin routes.
pub async fn admin_login(
    State(state): State<AppState>,
    payload: Result<Json<AdminLoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    if !secret_matches(&payload.password, &state.admin_hash) {
        tracing::warn!("Rejected admin login");
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_admin_token(&state.config.jwt_secret, state.config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
    })))
}

/// Uploads an assignment: a display name and exactly one audio file.
/// Admin only.
pub async fn create_assignment(
    State(pool): State<SqlitePool>,
    State(store): State<AudioStore>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut name: Option<String> = None;
    let mut audio: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(field.text().await?),
            "audio" => {
                let file_name = field.file_name().unwrap_or("audio.mp3").to_string();
                let data = field.bytes().await?;
                if !data.is_empty() {
                    audio = Some((file_name, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    let (file_name, data) =
        audio.ok_or_else(|| AppError::BadRequest("Audio file is required.".to_string()))?;

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_ASSIGNMENT_NAME.to_string());

    let stored = store.save(&file_name, &data).await?;

    let inserted = sqlx::query("INSERT INTO assignments (name, audio_path) VALUES (?, ?)")
        .bind(&name)
        .bind(&stored)
        .execute(&pool)
        .await;

    let id = match inserted {
        Ok(result) => result.last_insert_rowid(),
        Err(e) => {
            tracing::error!("Failed to create assignment: {:?}", e);
            store.remove(&stored).await;
            return Err(AppError::from(e));
        }
    };

    tracing::info!(assignment_id = id, audio = %stored, "Assignment created");

    Ok(Json(CreatedAssignment {
        id,
        name,
        audio: stored,
    }))
}

/// Creates a single-correct multiple choice question.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    payload: Result<Json<CreateQuestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload
        .validate()
        .map_err(|_| AppError::BadRequest("Missing fields.".to_string()))?;
    let choices = payload.sanitized_choices()?;

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM assignments WHERE id = ?")
        .bind(payload.assignment_id)
        .fetch_optional(&pool)
        .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Assignment not found".to_string()));
    }

    let mut tx = pool.begin().await?;

    let question_id = sqlx::query("INSERT INTO questions (assignment_id, qtype, text) VALUES (?, ?, ?)")
        .bind(payload.assignment_id)
        .bind(MCQ)
        .bind(&payload.text)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for choice in &choices {
        sqlx::query("INSERT INTO choices (question_id, label, is_correct) VALUES (?, ?, ?)")
            .bind(question_id)
            .bind(&choice.label)
            .bind(choice.is_correct)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(json!({ "id": question_id })))
}

/// Deletes a question and its choices.
/// Admin only.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("Invalid id".to_string()))?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM choices WHERE question_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::from(e)
        })?;

    tx.commit().await?;

    Ok(Json(json!({ "deleted": result.rows_affected() })))
}

/// Lists registered students with how many of their audios were played.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, RegistrantSummary>(
        r#"
        SELECT name, roll, college,
               MIN(created_at) AS created_at,
               SUM(used) AS used_count,
               COUNT(DISTINCT assignment_id) AS total_assignments
        FROM attempts
        GROUP BY name, roll, college
        ORDER BY MIN(created_at) ASC, MIN(id) ASC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load users: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(json!({ "users": users })))
}

/// Lists one student's recorded answers, resolved to choice labels.
/// Admin only.
pub async fn list_answers(
    State(pool): State<SqlitePool>,
    Query(identity): Query<StudentIdentity>,
) -> Result<impl IntoResponse, AppError> {
    identity
        .validate()
        .map_err(|_| AppError::BadRequest("Missing params".to_string()))?;

    let answers = sqlx::query_as::<_, AnswerRow>(
        r#"
        SELECT a.name AS assignment, q.text AS question,
               COALESCE(c.label, s.answer_text) AS answer
        FROM submissions s
        JOIN attempts t ON s.attempt_id = t.id
        JOIN assignments a ON t.assignment_id = a.id
        JOIN questions q ON s.question_id = q.id
        LEFT JOIN choices c
               ON c.id = CAST(s.answer_text AS INTEGER) AND c.question_id = s.question_id
        WHERE t.name = ? AND t.roll = ? AND t.college = ?
        ORDER BY a.created_at ASC, a.id ASC, q.id ASC, s.id ASC
        "#,
    )
    .bind(&identity.name)
    .bind(&identity.roll)
    .bind(&identity.college)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load answers: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(json!({ "answers": answers })))
}

/// Exports every submission as CSV.
/// Admin only.
pub async fn export_csv(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, ExportRow>(
        r#"
        SELECT t.name, t.roll, t.college,
               a.name AS assignment_name, q.text AS question_text, q.qtype,
               s.answer_text, c.label AS choice_label
        FROM submissions s
        JOIN attempts t ON t.id = s.attempt_id
        JOIN assignments a ON a.id = t.assignment_id
        JOIN questions q ON q.id = s.question_id
        LEFT JOIN choices c
               ON c.id = CAST(s.answer_text AS INTEGER) AND c.question_id = s.question_id
        ORDER BY t.created_at ASC, t.id ASC, a.created_at ASC, q.id ASC, s.id ASC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Export failed: {:?}", e);
        AppError::from(e)
    })?;

    let document = csv::render(&EXPORT_HEADER, rows.into_iter().map(ExportRow::into_fields));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"export.csv\""),
        ],
        document,
    ))
}
