use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use common::{AlwaysSettles, Argon2Hasher, Argon2Params, DEFAULT_DATABASE_URL, Database};

use crate::auth::TokenIssuer;
use crate::state::AppState;

pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub access_token_expire_minutes: i64,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env_or("PORT", 8080)?;

        let access_token_expire_minutes = env_or("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?;

        let argon2_memory_kib = env_or("ARGON2_MEMORY_KIB", Argon2Params::DEFAULT_M_COST)?;
        let argon2_iterations = env_or("ARGON2_ITERATIONS", Argon2Params::DEFAULT_T_COST)?;
        let argon2_parallelism = env_or("ARGON2_PARALLELISM", Argon2Params::DEFAULT_P_COST)?;

        Ok(Self {
            database_url,
            host,
            port,
            access_token_expire_minutes,
            argon2_memory_kib,
            argon2_iterations,
            argon2_parallelism,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        let db = Database::new(&self.database_url)
            .await
            .context("Failed to initialize database")?;
        log::info!("Database initialized successfully!");

        let hasher = Argon2Hasher::with_costs(
            self.argon2_memory_kib,
            self.argon2_iterations,
            self.argon2_parallelism,
        )
        .context("Failed to initialize password hasher")?;

        let tokens = TokenIssuer::generate(token_lifetime(self.access_token_expire_minutes)?);

        Ok(AppState::new(
            db,
            Arc::new(hasher),
            Arc::new(AlwaysSettles),
            tokens,
        ))
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} must be a number, got `{}`", key, value)),
        Err(_) => Ok(default),
    }
}

fn token_lifetime(minutes: i64) -> anyhow::Result<chrono::Duration> {
    chrono::Duration::try_minutes(minutes).with_context(|| {
        format!(
            "ACCESS_TOKEN_EXPIRE_MINUTES is out of range, got `{}`",
            minutes
        )
    })
}
