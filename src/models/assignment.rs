// src/models/assignment.rs

use serde::Serialize;
use sqlx::FromRow;

/// Represents the 'assignments' table in the database.
/// Immutable after upload.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Assignment {
    pub id: i64,
    pub name: String,

    /// File name inside the audio store, never a full path.
    pub audio_path: String,

    pub created_at: chrono::NaiveDateTime,
}

/// Response body after an upload.
#[derive(Debug, Serialize)]
pub struct CreatedAssignment {
    pub id: i64,
    pub name: String,
    pub audio: String,
}
