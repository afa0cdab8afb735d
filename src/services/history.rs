use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::request::{CallerId, RecommendationRequest};
use crate::models::result::EnrichedResult;

/// Hand-off for recording a finished recommendation against a caller.
///
/// Implemented by the history storage collaborator. A failed write is
/// logged by the orchestrator and never fails the recommendation itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    async fn record(
        &self,
        caller: CallerId,
        request: &RecommendationRequest,
        results: &[EnrichedResult],
    ) -> AppResult<()>;
}
