// src/handlers/registration.rs

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::attempt::{Attempt, StudentIdentity},
};

const ALREADY_REGISTERED: &str = "This student is already registered.";

/// Registers a student.
///
/// Creates one unused attempt per existing assignment, all in one
/// transaction. Fails if the identity already holds any attempt or if there
/// are no assignments yet.
pub async fn register(
    State(pool): State<SqlitePool>,
    payload: Result<Json<StudentIdentity>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(identity) = payload?;
    identity
        .validate()
        .map_err(|_| AppError::BadRequest("Missing fields.".to_string()))?;

    if Attempt::identity_exists(&pool, &identity).await? {
        return Err(AppError::BadRequest(ALREADY_REGISTERED.to_string()));
    }

    let assignment_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM assignments ORDER BY created_at ASC, id ASC")
            .fetch_all(&pool)
            .await?;

    if assignment_ids.is_empty() {
        return Err(AppError::BadRequest("No assignments available.".to_string()));
    }

    let mut tx = pool.begin().await?;

    for assignment_id in &assignment_ids {
        sqlx::query("INSERT INTO attempts (assignment_id, name, roll, college) VALUES (?, ?, ?, ?)")
            .bind(assignment_id)
            .bind(&identity.name)
            .bind(&identity.roll)
            .bind(&identity.college)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                // A concurrent registration for the same student got there first.
                if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                    AppError::BadRequest(ALREADY_REGISTERED.to_string())
                } else {
                    tracing::error!("Failed to create attempt: {:?}", e);
                    AppError::from(e)
                }
            })?;
    }

    tx.commit().await?;

    tracing::info!(
        roll = %identity.roll,
        attempts = assignment_ids.len(),
        "Student registered"
    );

    Ok(Json(json!({ "success": true })))
}
