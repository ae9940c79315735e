// src/utils/mod.rs

pub mod csv;
pub mod jwt;
pub mod secret;
pub mod storage;
