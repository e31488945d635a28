use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::database::store::ShareStore;
use crate::models::analytics::{EventSummary, NewAccessEvent};
use crate::models::file::{NewSharedFile, SharedFile};
use crate::models::share::{NewShare, Share};
use crate::utils::error::AppResult;

pub struct SqliteShareStore {
    pool: SqlitePool,
}

impl SqliteShareStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so keep exactly one alive.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations/sqlite").run(pool).await?;
    Ok(())
}

#[async_trait]
impl ShareStore for SqliteShareStore {
    async fn create_share(&self, share: &NewShare) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO shares (share_id, created_at, expires_at, password_hash, brand_name, language, is_active)
             VALUES (?, ?, ?, ?, ?, ?, TRUE)",
        )
        .bind(&share.share_id)
        .bind(share.created_at)
        .bind(share.expires_at)
        .bind(&share.password_hash)
        .bind(&share.brand_name)
        .bind(&share.language)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn add_file(&self, file: &NewSharedFile) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO files (share_id, original_name, stored_name, file_size, mime_type)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&file.share_id)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_share(&self, share_id: &str) -> AppResult<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(
            "SELECT * FROM shares WHERE share_id = ? AND is_active = TRUE",
        )
        .bind(share_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(share)
    }

    async fn get_files(&self, share_id: &str) -> AppResult<Vec<SharedFile>> {
        let files =
            sqlx::query_as::<_, SharedFile>("SELECT * FROM files WHERE share_id = ? ORDER BY id")
                .bind(share_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(files)
    }

    async fn track_event(&self, event: &NewAccessEvent) -> AppResult<i64> {
        let result = sqlx::query(
            "INSERT INTO analytics (event_type, share_id, timestamp, user_agent, ip_address)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event.event_type.as_str())
        .bind(&event.share_id)
        .bind(event.timestamp)
        .bind(&event.user_agent)
        .bind(&event.ip_address)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_analytics(&self, share_id: &str) -> AppResult<Vec<EventSummary>> {
        let rows = sqlx::query(
            "SELECT event_type, COUNT(*) AS count, MAX(timestamp) AS last_event
             FROM analytics
             WHERE share_id = ?
             GROUP BY event_type
             ORDER BY event_type",
        )
        .bind(share_id)
        .fetch_all(&self.pool)
        .await?;

        // MAX() loses the column's declared type, so decode the timestamp by hand.
        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let last_event: Option<String> = row.try_get("last_event")?;
            summaries.push(EventSummary {
                event_type: row.try_get("event_type")?,
                count: row.try_get("count")?,
                last_event: last_event.and_then(|raw| {
                    chrono::DateTime::parse_from_rfc3339(&raw)
                        .map(|t| t.with_timezone(&Utc))
                        .ok()
                }),
            });
        }

        Ok(summaries)
    }

    async fn cleanup_expired(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE shares SET is_active = FALSE
             WHERE expires_at IS NOT NULL AND expires_at < ? AND is_active = TRUE",
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
        "sqlite"
    }
}
