use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::catalog::CatalogEntry;
use crate::services::catalog::CatalogLookup;

/// Postgres-backed catalog repository.
///
/// Matches are case-insensitive on title and artist; the catalog itself is
/// written by the registration feature, this repository only reads it.
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CatalogLookup for PgCatalogRepository {
    async fn find_by_title(&self, title: &str) -> AppResult<Option<CatalogEntry>> {
        let entry = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT title, artist, album_cover_url, video_id
            FROM music
            WHERE lower(title) = lower($1)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn find_by_title_and_artist(
        &self,
        title: &str,
        artist: &str,
    ) -> AppResult<Option<CatalogEntry>> {
        let entry = sqlx::query_as::<_, CatalogEntry>(
            r#"
            SELECT title, artist, album_cover_url, video_id
            FROM music
            WHERE lower(title) = lower($1) AND lower(artist) = lower($2)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(title)
        .bind(artist)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }
}
