// src/config.rs

use std::{env, fmt, path::PathBuf};

use dotenvy::dotenv;

/// Seconds a student gets per assignment before answers are auto-submitted.
pub const ASSIGNMENT_DURATION_SECS: u32 = 60;

/// Remaining seconds at which the countdown switches to its danger style.
pub const DANGER_THRESHOLD_SECS: u32 = 15;

/// Name stored when an assignment is uploaded without one.
pub const DEFAULT_ASSIGNMENT_NAME: &str = "Untitled Assignment";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub admin_password: String,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub rust_log: String,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, value) => write!(f, "{} has an invalid value: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data.db?mode=rwc".to_string());

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let admin_password =
            env::var("ADMIN_PASSWORD").map_err(|_| ConfigError::Missing("ADMIN_PASSWORD"))?;

        let jwt_expiration = parse_or("JWT_EXPIRATION", 3600)?;
        let port = parse_or("PORT", 3000)?;
        let max_upload_mb: usize = parse_or("MAX_UPLOAD_MB", 50)?;
        let max_upload_bytes = upload_limit_bytes(max_upload_mb)?;

        let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
        let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            admin_password,
            upload_dir: PathBuf::from(upload_dir),
            static_dir: PathBuf::from(static_dir),
            port,
            max_upload_bytes,
            rust_log,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

fn upload_limit_bytes(megabytes: usize) -> Result<usize, ConfigError> {
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| ConfigError::Invalid("MAX_UPLOAD_MB", megabytes.to_string()))
}
