// src/playback/gate.rs

use sqlx::SqlitePool;

use crate::{error::AppError, models::attempt::Attempt, playback::range::RangeSpec};

/// What the gate decided for one stream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Fresh playback: consume the attempt, then send the whole file.
    StartPlayback,
    /// Continuation of a stream already in flight: send the span as-is.
    ServeRange(RangeSpec),
    /// Fresh playback on a consumed attempt.
    Deny,
}

/// The full one-time gate. Ranged requests always pass; unranged requests
/// pass only while the attempt is unused.
pub fn decide(used: bool, range: Option<RangeSpec>) -> GateDecision {
    match (used, range) {
        (_, Some(spec)) => GateDecision::ServeRange(spec),
        (false, None) => GateDecision::StartPlayback,
        (true, None) => GateDecision::Deny,
    }
}

/// What the stream handler should send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Full,
    Partial(RangeSpec),
}

/// Applies [`decide`] and, for a fresh playback, records the consumption in
/// the ledger before anything is streamed.
///
/// `attempt.used` may be stale by the time this runs. The conditional update
/// is authoritative: losing the race is reported as `AlreadyConsumed`.
pub async fn admit(
    pool: &SqlitePool,
    attempt: &Attempt,
    range: Option<RangeSpec>,
) -> Result<Admission, AppError> {
    match decide(attempt.used, range) {
        GateDecision::ServeRange(spec) => {
            tracing::debug!(
                attempt_id = attempt.id,
                ?spec,
                "Serving range continuation"
            );
            Ok(Admission::Partial(spec))
        }
        GateDecision::Deny => {
            tracing::info!(attempt_id = attempt.id, "Denied replay of consumed audio");
            Err(AppError::AlreadyConsumed)
        }
        GateDecision::StartPlayback => {
            if Attempt::mark_used(pool, attempt.id).await? {
                tracing::info!(
                    attempt_id = attempt.id,
                    assignment_id = attempt.assignment_id,
                    "Playback started, attempt marked used"
                );
                Ok(Admission::Full)
            } else {
                tracing::info!(attempt_id = attempt.id, "Lost race for first playback");
                Err(AppError::AlreadyConsumed)
            }
        }
    }
}
