use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use super::models::{ContentRecord, NewContent};
use crate::core::feed::types::ContentKind;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Content collections (sermons, notices, bulletins, ...) backed by SQLite.
#[derive(Debug, Clone)]
pub struct ContentRepository {
    pool: SqlitePool,
}

impl ContentRepository {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn name(&self) -> &'static str {
        "storage"
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn insert_content(&self, content: &NewContent) -> Result<ContentRecord, StorageError> {
        let id = sqlx::query(
            r#"
            INSERT INTO contents (kind, title, link_url, thumbnail, description, published_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(content.kind.as_str())
        .bind(&content.title)
        .bind(&content.link_url)
        .bind(&content.thumbnail)
        .bind(&content.description)
        .bind(&content.published_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        let record = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT id, kind, title, link_url, thumbnail, description, published_at, created_at
            FROM contents
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn list_contents(
        &self,
        kind: Option<ContentKind>,
        limit: i64,
    ) -> Result<Vec<ContentRecord>, StorageError> {
        let rows = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT id, kind, title, link_url, thumbnail, description, published_at, created_at
            FROM contents
            WHERE (?1 IS NULL OR kind = ?1)
            ORDER BY published_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(kind.map(|value| value.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_content(&self, id: i64) -> Result<Option<ContentRecord>, StorageError> {
        let row = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT id, kind, title, link_url, thumbnail, description, published_at, created_at
            FROM contents
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn delete_content(&self, id: i64) -> Result<u64, StorageError> {
        let affected = sqlx::query("DELETE FROM contents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected)
    }
}
