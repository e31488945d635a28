use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::database::store::ShareStore;
use crate::models::analytics::{EventSummary, NewAccessEvent};
use crate::models::file::{NewSharedFile, SharedFile};
use crate::models::share::{NewShare, Share};
use crate::utils::error::AppResult;

pub struct PostgresShareStore {
    pool: PgPool,
}

impl PostgresShareStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations/postgres").run(pool).await?;
    Ok(())
}

#[async_trait]
impl ShareStore for PostgresShareStore {
    async fn create_share(&self, share: &NewShare) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO shares (share_id, created_at, expires_at, password_hash, brand_name, language, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, TRUE)
             RETURNING id",
        )
        .bind(&share.share_id)
        .bind(share.created_at)
        .bind(share.expires_at)
        .bind(&share.password_hash)
        .bind(&share.brand_name)
        .bind(&share.language)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn add_file(&self, file: &NewSharedFile) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (share_id, original_name, stored_name, file_size, mime_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(&file.share_id)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_share(&self, share_id: &str) -> AppResult<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(
            "SELECT * FROM shares WHERE share_id = $1 AND is_active = TRUE",
        )
        .bind(share_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(share)
    }

    async fn get_files(&self, share_id: &str) -> AppResult<Vec<SharedFile>> {
        let files =
            sqlx::query_as::<_, SharedFile>("SELECT * FROM files WHERE share_id = $1 ORDER BY id")
                .bind(share_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(files)
    }

    async fn track_event(&self, event: &NewAccessEvent) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO analytics (event_type, share_id, timestamp, user_agent, ip_address)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(event.event_type.as_str())
        .bind(&event.share_id)
        .bind(event.timestamp)
        .bind(&event.user_agent)
        .bind(&event.ip_address)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get_analytics(&self, share_id: &str) -> AppResult<Vec<EventSummary>> {
        let summaries = sqlx::query_as::<_, EventSummary>(
            "SELECT event_type, COUNT(*) AS count, MAX(timestamp) AS last_event
             FROM analytics
             WHERE share_id = $1
             GROUP BY event_type
             ORDER BY event_type",
        )
        .bind(share_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    async fn cleanup_expired(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE shares SET is_active = FALSE
             WHERE expires_at IS NOT NULL AND expires_at < $1 AND is_active = TRUE",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
