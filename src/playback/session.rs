// src/playback/session.rs

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::{
    config::ASSIGNMENT_DURATION_SECS,
    error::AppError,
    models::{
        attempt::StudentIdentity,
        submission::{AnswerValue, ScoreResponse, SubmittedAnswer},
    },
    playback::timer::{AssignmentTimer, Countdown},
};

/// Sends one assignment's answers and returns its score.
#[async_trait]
pub trait AnswerSubmitter: Send + Sync + 'static {
    async fn submit(
        &self,
        assignment_id: i64,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<ScoreResponse, AppError>;
}

/// One entry of the ordered assignment queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedAssignment {
    pub assignment_id: i64,
    pub name: String,
}

/// What the page shows for the current assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presented {
    pub assignment: QueuedAssignment,
    pub stream_path: String,
}

/// Outcome of one assignment. `score` is `None` when the submit call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentResult {
    pub assignment: String,
    pub answers: Vec<SubmittedAnswer>,
    pub score: Option<ScoreResponse>,
}

/// Rating shown next to the overall result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Great,
    Good,
    Neutral,
    Poor,
    Bad,
}

impl Mood {
    pub fn from_score(score: i64, total: i64) -> Self {
        if total <= 0 {
            return Mood::Bad;
        }
        let percentage = score as f64 * 100.0 / total as f64;
        match percentage {
            p if p >= 80.0 => Mood::Great,
            p if p >= 60.0 => Mood::Good,
            p if p >= 40.0 => Mood::Neutral,
            p if p >= 20.0 => Mood::Poor,
            _ => Mood::Bad,
        }
    }

    pub fn face(&self) -> &'static str {
        match self {
            Mood::Great => "😁",
            Mood::Good => "😊",
            Mood::Neutral => "😐",
            Mood::Poor => "☹️",
            Mood::Bad => "😢",
        }
    }
}

/// Terminal "all complete" view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSummary {
    pub score: i64,
    pub total: i64,
    pub mood: Mood,
    pub results: Vec<AssignmentResult>,
}

/// Where the run is after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Next(Presented),
    Complete(QuizSummary),
}

type Selections = Arc<Mutex<BTreeMap<i64, i64>>>;

/// Drives a student through the assignment queue.
///
/// Each presented assignment gets a fresh answer sheet and its own
/// [`AssignmentTimer`]. When the timer expires it submits whatever is
/// selected at that moment; [`QuizRun::await_submission`] then records the
/// result and presents the next assignment.
pub struct QuizRun<S: AnswerSubmitter> {
    identity: StudentIdentity,
    submitter: Arc<S>,
    queue: Vec<QueuedAssignment>,
    index: usize,
    duration_secs: u32,
    selections: Selections,
    timer: Option<AssignmentTimer>,
    pending: Option<oneshot::Receiver<(Vec<SubmittedAnswer>, Option<ScoreResponse>)>>,
    grand_score: i64,
    grand_total: i64,
    results: Vec<AssignmentResult>,
}

impl<S: AnswerSubmitter> QuizRun<S> {
    pub fn new(identity: StudentIdentity, submitter: S, queue: Vec<QueuedAssignment>) -> Self {
        Self::with_duration(identity, submitter, queue, ASSIGNMENT_DURATION_SECS)
    }

    pub fn with_duration(
        identity: StudentIdentity,
        submitter: S,
        queue: Vec<QueuedAssignment>,
        duration_secs: u32,
    ) -> Self {
        Self {
            identity,
            submitter: Arc::new(submitter),
            queue,
            index: 0,
            duration_secs,
            selections: Arc::new(Mutex::new(BTreeMap::new())),
            timer: None,
            pending: None,
            grand_score: 0,
            grand_total: 0,
            results: Vec::new(),
        }
    }

    /// Presents the first assignment. Returns the summary straight away when
    /// the queue is empty.
    pub fn begin(&mut self) -> Stage {
        self.index = 0;
        self.present_current()
    }

    pub fn current(&self) -> Option<&QueuedAssignment> {
        self.queue.get(self.index)
    }

    pub fn countdown(&self) -> Option<Countdown> {
        self.timer.as_ref().map(AssignmentTimer::countdown)
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.queue.len()
    }

    /// Picks a choice for a question of the current assignment. Ignored once
    /// the countdown has stopped.
    pub fn select(&self, question_id: i64, choice_id: i64) -> bool {
        if !self.countdown().is_some_and(|c| c.is_running()) {
            return false;
        }
        lock_selections(&self.selections).insert(question_id, choice_id);
        true
    }

    /// Waits for the current assignment's timer to expire and its answers to
    /// be submitted, then moves on.
    pub async fn await_submission(&mut self) -> Stage {
        let Some(pending) = self.pending.take() else {
            return Stage::Complete(self.summary());
        };

        // A dropped sender means the timer was cancelled mid-flight.
        let (answers, score) = pending.await.unwrap_or_default();

        if let Some(result) = score {
            self.grand_score += result.score;
            self.grand_total += result.total;
        }

        if let Some(assignment) = self.current() {
            self.results.push(AssignmentResult {
                assignment: assignment.name.clone(),
                answers,
                score,
            });
        }

        self.index += 1;
        self.present_current()
    }

    /// Runs every remaining assignment to the end.
    pub async fn run_to_completion(&mut self) -> QuizSummary {
        loop {
            if let Stage::Complete(summary) = self.await_submission().await {
                return summary;
            }
        }
    }

    pub fn summary(&self) -> QuizSummary {
        QuizSummary {
            score: self.grand_score,
            total: self.grand_total,
            mood: Mood::from_score(self.grand_score, self.grand_total),
            results: self.results.clone(),
        }
    }

    fn present_current(&mut self) -> Stage {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }

        let Some(assignment) = self.current().cloned() else {
            self.pending = None;
            return Stage::Complete(self.summary());
        };

        self.selections = Arc::new(Mutex::new(BTreeMap::new()));
        let (tx, rx) = oneshot::channel();
        self.pending = Some(rx);

        let selections = self.selections.clone();
        let submitter = self.submitter.clone();
        let assignment_id = assignment.assignment_id;

        self.timer = Some(AssignmentTimer::start(self.duration_secs, move || async move {
            let answers: Vec<SubmittedAnswer> = lock_selections(&selections)
                .iter()
                .map(|(question_id, choice_id)| SubmittedAnswer {
                    question_id: *question_id,
                    answer: AnswerValue::Id(*choice_id),
                })
                .collect();

            let score = match submitter.submit(assignment_id, answers.clone()).await {
                Ok(score) => Some(score),
                Err(e) => {
                    tracing::warn!("Auto-submit for assignment {} failed: {}", assignment_id, e);
                    None
                }
            };

            let _ = tx.send((answers, score));
        }));

        tracing::debug!("Presenting assignment {}", assignment_id);

        Stage::Next(Presented {
            stream_path: self.identity.stream_path(assignment_id),
            assignment,
        })
    }
}

fn lock_selections(selections: &Selections) -> std::sync::MutexGuard<'_, BTreeMap<i64, i64>> {
    selections
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
