// src/state.rs

use crate::{
    config::Config,
    error::AppError,
    utils::{secret::digest_secret, storage::AudioStore},
};
use axum::extract::FromRef;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub store: AudioStore,
    /// Argon2 hash of the admin password, derived once at startup.
    pub admin_hash: String,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for AudioStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl AppState {
    /// Builds the shared state, creating the upload directory and hashing
    /// the admin password once up front.
    pub async fn new(pool: SqlitePool, config: Config) -> Result<Self, AppError> {
        let store = AudioStore::new(config.upload_dir.clone());
        store.ensure_root().await?;

        let admin_hash = digest_secret(&config.admin_password)?;

        Ok(Self {
            pool,
            config,
            store,
            admin_hash,
        })
    }
}
