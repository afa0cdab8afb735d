use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::catalog::CatalogEntry;

/// Narrow lookup interface over the catalog storage collaborator.
///
/// Defined here so the pipeline depends only on what it needs; the Postgres
/// repository implements it at composition time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn find_by_title(&self, title: &str) -> AppResult<Option<CatalogEntry>>;

    async fn find_by_title_and_artist(
        &self,
        title: &str,
        artist: &str,
    ) -> AppResult<Option<CatalogEntry>>;
}
