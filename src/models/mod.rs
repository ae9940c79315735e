// src/models/mod.rs

pub mod assignment;
pub mod attempt;
pub mod question;
pub mod submission;
