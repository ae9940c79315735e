// src/models/attempt.rs

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{FromRow, SqlitePool};
use url::form_urlencoded;
use validator::Validate;

/// Natural key of a student. There is no account table; every request that
/// acts for a student carries these three fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StudentIdentity {
    #[serde(default, deserialize_with = "loose_text")]
    #[validate(custom(function = not_blank))]
    pub name: String,
    #[serde(default, deserialize_with = "loose_text")]
    #[validate(custom(function = not_blank))]
    pub roll: String,
    #[serde(default, deserialize_with = "loose_text")]
    #[validate(custom(function = not_blank))]
    pub college: String,
}

/// Reads a string or a number as text. Anything else becomes empty and
/// fails validation.
fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("must_not_be_blank"));
    }
    Ok(())
}

impl StudentIdentity {
    pub fn new(name: impl Into<String>, roll: impl Into<String>, college: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roll: roll.into(),
            college: college.into(),
        }
    }

    /// Path of the one-time audio stream for this student.
    pub fn stream_path(&self, assignment_id: i64) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("name", &self.name)
            .append_pair("roll", &self.roll)
            .append_pair("college", &self.college)
            .finish();
        format!("/api/stream/{}?{}", assignment_id, query)
    }
}

/// Represents the 'attempts' table: the playback ledger.
///
/// `used` only ever moves from false to true, and only through
/// [`Attempt::mark_used`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attempt {
    pub id: i64,
    pub assignment_id: i64,
    pub name: String,
    pub roll: String,
    pub college: String,
    pub used: bool,
    pub score: i64,
    pub total: i64,
    pub created_at: chrono::NaiveDateTime,
}

impl Attempt {
    /// Looks up the attempt for one student on one assignment.
    pub async fn find_for(
        pool: &SqlitePool,
        assignment_id: i64,
        identity: &StudentIdentity,
    ) -> Result<Option<Attempt>, sqlx::Error> {
        sqlx::query_as::<_, Attempt>(
            r#"
            SELECT id, assignment_id, name, roll, college, used, score, total, created_at
            FROM attempts
            WHERE assignment_id = ? AND name = ? AND roll = ? AND college = ?
            "#,
        )
        .bind(assignment_id)
        .bind(&identity.name)
        .bind(&identity.roll)
        .bind(&identity.college)
        .fetch_optional(pool)
        .await
    }

    /// True if the student already holds any attempt.
    pub async fn identity_exists(
        pool: &SqlitePool,
        identity: &StudentIdentity,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM attempts WHERE name = ? AND roll = ? AND college = ? LIMIT 1",
        )
        .bind(&identity.name)
        .bind(&identity.roll)
        .bind(&identity.college)
        .fetch_optional(pool)
        .await?;

        Ok(row.is_some())
    }

    /// Consumes the single full playback.
    ///
    /// One conditional update, so two racing requests cannot both see the
    /// flag unset. Returns whether this call made the transition.
    pub async fn mark_used(pool: &SqlitePool, attempt_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE attempts SET used = 1 WHERE id = ? AND used = 0")
            .bind(attempt_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// One student as listed for admins, aggregated over their attempts.
#[derive(Debug, Serialize, FromRow)]
pub struct RegistrantSummary {
    pub name: String,
    pub roll: String,
    pub college: String,
    pub created_at: Option<String>,
    pub used_count: i64,
    pub total_assignments: i64,
}
