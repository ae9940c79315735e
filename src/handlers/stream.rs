// src/handlers/stream.rs

use std::io::SeekFrom;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use sqlx::SqlitePool;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use validator::Validate;

use crate::{
    error::AppError,
    models::attempt::{Attempt, StudentIdentity},
    playback::{
        gate::{self, Admission},
        range::{ByteRange, parse_range_header},
    },
    utils::storage::{AudioStore, StoredAudio},
};

/// Streams an assignment's audio to a registered student.
///
/// * No attempt for the student: 403 `Not registered`.
/// * Unranged request: allowed once. The attempt is marked used before the
///   body starts; later unranged requests get 403.
/// * Ranged request: always served as 206, so the browser can keep fetching
///   pieces of the playback it already started.
pub async fn stream_audio(
    State(pool): State<SqlitePool>,
    State(store): State<AudioStore>,
    Path(assignment_id): Path<String>,
    Query(identity): Query<StudentIdentity>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let assignment_id = assignment_id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest("Invalid request".to_string()))?;

    identity
        .validate()
        .map_err(|_| AppError::BadRequest("Invalid request".to_string()))?;

    let attempt = Attempt::find_for(&pool, assignment_id, &identity)
        .await?
        .ok_or(AppError::NotRegistered)?;

    let audio_path: Option<String> =
        sqlx::query_scalar("SELECT audio_path FROM assignments WHERE id = ?")
            .bind(assignment_id)
            .fetch_optional(&pool)
            .await?;

    let audio_path = audio_path.ok_or_else(|| {
        AppError::ResourceMissing(format!("assignment {} has no row", assignment_id))
    })?;

    // Checked before the gate so a broken upload never burns the play.
    let audio = store.open(&audio_path).await?.ok_or_else(|| {
        AppError::ResourceMissing(format!(
            "{} missing from {}",
            audio_path,
            store.root().display()
        ))
    })?;

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_range_header);

    match gate::admit(&pool, &attempt, range).await? {
        Admission::Full => full_body(audio),
        Admission::Partial(spec) => {
            let span = spec
                .resolve(audio.size)
                .ok_or(AppError::RangeNotSatisfiable(audio.size))?;
            partial_body(audio, span).await
        }
    }
}

fn full_body(audio: StoredAudio) -> Result<Response, AppError> {
    let body = Body::from_stream(ReaderStream::new(audio.file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(audio.content_type))
        .header(header::CONTENT_LENGTH, audio.size)
        .header(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"))
        .body(body)
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

async fn partial_body(mut audio: StoredAudio, span: ByteRange) -> Result<Response, AppError> {
    audio.file.seek(SeekFrom::Start(span.start)).await?;
    let body = Body::from_stream(ReaderStream::new(audio.file.take(span.len())));

    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, HeaderValue::from_static(audio.content_type))
        .header(header::CONTENT_RANGE, span.content_range(audio.size))
        .header(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"))
        .header(header::CONTENT_LENGTH, span.len())
        .body(body)
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}
