use serde::{Deserialize, Serialize};

/// Canonical record for a known piece of music.
///
/// Owned by the catalog storage collaborator; read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogEntry {
    pub title: String,
    pub artist: String,
    pub album_cover_url: Option<String>,
    /// External video reference for playback (e.g. a video platform ID)
    pub video_id: Option<String>,
}
