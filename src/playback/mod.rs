// src/playback/mod.rs

//! One-time audio delivery.
//!
//! `range` and `gate` run on the server inside the stream handler. `lock`,
//! `timer` and `session` are the browser-side rules as plain state machines,
//! so they can be driven from tests without a media element or a real clock.

pub mod gate;
pub mod lock;
pub mod range;
pub mod session;
pub mod timer;
