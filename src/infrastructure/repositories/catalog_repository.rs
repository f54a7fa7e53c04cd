use crate::domain::catalog::{Book, Voice};
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use async_trait::async_trait;
use std::sync::Arc;

/// Read access to the externally-owned book and voice catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_book(&self, book_id: i64) -> AppResult<Option<Book>>;

    async fn find_voice(&self, voice_id: i64) -> AppResult<Option<Voice>>;
}

pub struct PostgresCatalogRepository {
    pool: Arc<DbPool>,
}

impl PostgresCatalogRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn find_book(&self, book_id: i64) -> AppResult<Option<Book>> {
        let pool = self.pool.as_ref();
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT id, title, description, source_path
            FROM books
            WHERE id = $1
            "#,
        )
        .bind(book_id)
        .fetch_optional(pool)
        .await?;

        Ok(book)
    }

    async fn find_voice(&self, voice_id: i64) -> AppResult<Option<Voice>> {
        let pool = self.pool.as_ref();
        let voice = sqlx::query_as::<_, Voice>(
            r#"
            SELECT id, short_name
            FROM voices
            WHERE id = $1
            "#,
        )
        .bind(voice_id)
        .fetch_optional(pool)
        .await?;

        Ok(voice)
    }
}
