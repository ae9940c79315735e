// src/handlers/mod.rs

pub mod admin;
pub mod assignment;
pub mod quiz;
pub mod registration;
pub mod stream;
