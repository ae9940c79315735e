// src/playback/lock.rs

/// Notice shown when a finished clip is started again.
pub const PLAY_BLOCKED_NOTICE: &str = "Audio can only be played once.";

/// Native state of the media element as the lock sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Paused,
    Playing,
    Ended,
}

/// What the player must do after feeding an event to the lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockAction {
    /// Let the element continue.
    Proceed,
    /// Pause and show the notice.
    Block { notice: &'static str },
    /// Set the element's position back to this many seconds.
    SeekTo(f64),
    /// Hide the controls and pause.
    Finish,
}

/// No-scrub, no-replay rules layered over a seekable audio element.
///
/// This only keeps an honest UI honest; the server-side gate is what
/// actually limits a student to one playback.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackLock {
    lock_position: f64,
    already_played: bool,
    media: MediaState,
    controls_enabled: bool,
}

impl Default for PlaybackLock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackLock {
    pub fn new() -> Self {
        Self {
            lock_position: 0.0,
            already_played: false,
            media: MediaState::Paused,
            controls_enabled: true,
        }
    }

    pub fn lock_position(&self) -> f64 {
        self.lock_position
    }

    pub fn already_played(&self) -> bool {
        self.already_played
    }

    pub fn media_state(&self) -> MediaState {
        self.media
    }

    pub fn controls_enabled(&self) -> bool {
        self.controls_enabled
    }

    /// `play` event.
    pub fn on_play(&mut self, current_time: f64) -> LockAction {
        if self.already_played {
            self.media = MediaState::Paused;
            return LockAction::Block {
                notice: PLAY_BLOCKED_NOTICE,
            };
        }

        self.advance(current_time);
        self.media = MediaState::Playing;
        LockAction::Proceed
    }

    /// `pause` event.
    pub fn on_pause(&mut self) {
        if self.media == MediaState::Playing {
            self.media = MediaState::Paused;
        }
    }

    /// `timeupdate` event: natural progress only ever raises the lock.
    pub fn on_time_update(&mut self, current_time: f64) {
        self.advance(current_time);
    }

    /// `seeking` event: any jump away from the lock is undone, forwards or
    /// backwards.
    pub fn on_seeking(&mut self, current_time: f64) -> LockAction {
        if current_time != self.lock_position {
            LockAction::SeekTo(self.lock_position)
        } else {
            LockAction::Proceed
        }
    }

    /// `ended` event.
    pub fn on_ended(&mut self) -> LockAction {
        self.already_played = true;
        self.controls_enabled = false;
        self.media = MediaState::Ended;
        LockAction::Finish
    }

    fn advance(&mut self, current_time: f64) {
        if current_time > self.lock_position {
            self.lock_position = current_time;
        }
    }
}
