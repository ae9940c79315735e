// src/playback/timer.rs

use std::{future::Future, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::config::{ASSIGNMENT_DURATION_SECS, DANGER_THRESHOLD_SECS};

/// Per-assignment countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Running(u32),
    Expired,
    Submitted,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    /// This tick reached zero.
    Expired,
    /// Already stopped; nothing changed.
    Idle,
}

impl Countdown {
    /// The standard assignment countdown.
    pub fn start() -> Self {
        Self::with_duration(ASSIGNMENT_DURATION_SECS)
    }

    pub fn with_duration(seconds: u32) -> Self {
        if seconds == 0 {
            Countdown::Expired
        } else {
            Countdown::Running(seconds)
        }
    }

    /// Advances by one second.
    pub fn tick(&mut self) -> Tick {
        match *self {
            Countdown::Running(remaining) => {
                let left = remaining.saturating_sub(1);
                if left == 0 {
                    *self = Countdown::Expired;
                    Tick::Expired
                } else {
                    *self = Countdown::Running(left);
                    Tick::Running(left)
                }
            }
            Countdown::Expired | Countdown::Submitted => Tick::Idle,
        }
    }

    /// Moves `Expired` to `Submitted`. Other states are left untouched.
    pub fn mark_submitted(&mut self) -> bool {
        if *self == Countdown::Expired {
            *self = Countdown::Submitted;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> u32 {
        match self {
            Countdown::Running(remaining) => *remaining,
            _ => 0,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Countdown::Running(_))
    }

    /// Cosmetic only.
    pub fn is_danger(&self) -> bool {
        self.remaining() <= DANGER_THRESHOLD_SECS
    }

    /// `MM:SS`.
    pub fn display(&self) -> String {
        let remaining = self.remaining();
        format!("{:02}:{:02}", remaining / 60, remaining % 60)
    }
}

/// Countdown running as a tokio task.
///
/// Ticks once per second, runs `on_expire` when it reaches zero and reports
/// `Submitted` once that future finishes. It cannot be paused or extended;
/// [`AssignmentTimer::cancel`] (or dropping the timer) stops it for good and
/// `on_expire` is then never called.
#[derive(Debug)]
pub struct AssignmentTimer {
    state: watch::Receiver<Countdown>,
    task: JoinHandle<()>,
}

impl AssignmentTimer {
    pub fn start<F, Fut>(duration_secs: u32, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let initial = Countdown::with_duration(duration_secs);
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

            let mut countdown = initial;
            while countdown.is_running() {
                interval.tick().await;
                countdown.tick();
                tx.send_replace(countdown);
            }

            on_expire().await;

            countdown.mark_submitted();
            tx.send_replace(countdown);
        });

        Self { state: rx, task }
    }

    pub fn countdown(&self) -> Countdown {
        *self.state.borrow()
    }

    /// Receiver for UI updates on every tick.
    pub fn subscribe(&self) -> watch::Receiver<Countdown> {
        self.state.clone()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Waits for `Submitted`. Returns false if the timer was cancelled first.
    pub async fn submitted(&self) -> bool {
        let mut state = self.state.clone();
        state
            .wait_for(|c| *c == Countdown::Submitted)
            .await
            .is_ok()
    }
}

impl Drop for AssignmentTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
