//! PostgreSQL record store.
//!
//! Opening the store connects the pool and brings the `storages` and
//! `upload_tasks` tables up to the schema embedded from `migrations/`.

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use lanyue_core::config::database::DatabaseConfig;
use lanyue_core::error::{AppError, ErrorKind};
use lanyue_core::result::AppResult;

use crate::repositories::{PgStorageRepository, PgUploadTaskRepository};

static SCHEMA: Migrator = sqlx::migrate!("../../migrations");

/// A connected PostgreSQL record store with an up-to-date schema.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        let target = redact_url(&config.url);
        info!(
            url = %target,
            max_connections = config.max_connections,
            "Opening PostgreSQL record store"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Record store at {target} is unreachable"),
                    e,
                )
            })?;

        let store = Self { pool };
        store.upgrade_schema().await?;
        Ok(store)
    }

    async fn upgrade_schema(&self) -> AppResult<()> {
        SCHEMA.run(&self.pool).await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Record store schema upgrade failed", e)
        })?;
        debug!(migrations = SCHEMA.iter().count(), "Record store schema is current");
        Ok(())
    }

    pub fn storages(&self) -> PgStorageRepository {
        PgStorageRepository::new(self.pool.clone())
    }

    pub fn upload_tasks(&self) -> PgUploadTaskRepository {
        PgUploadTaskRepository::new(self.pool.clone())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Record store ping failed", e))
    }
}

/// Replace the password in the userinfo part of a connection URL.
fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|p| p + 3) else {
        return url.to_string();
    };
    let authority_end = url[scheme_end..]
        .find('/')
        .map_or(url.len(), |p| scheme_end + p);
    let Some(at) = url[scheme_end..authority_end].rfind('@').map(|p| scheme_end + p) else {
        return url.to_string();
    };
    match url[scheme_end..at].find(':').map(|p| scheme_end + p) {
        Some(colon) => format!("{}:****{}", &url[..colon], &url[at..]),
        None => url.to_string(),
    }
}
