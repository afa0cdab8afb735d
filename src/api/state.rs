use std::path::PathBuf;
use std::sync::Arc;

use crate::services::RecommendationService;

/// Shared application state
///
/// Collaborators are wired into the recommendation service at composition
/// time (see `main.rs`); handlers only see the assembled pipeline.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<RecommendationService>,
    /// Directory retained artifacts are served from under `/media`
    pub media_dir: PathBuf,
}

impl AppState {
    pub fn new(recommender: Arc<RecommendationService>, media_dir: PathBuf) -> Self {
        Self {
            recommender,
            media_dir,
        }
    }
}
