use chrono::Utc;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::request::{CallerId, RecommendationRequest};
use crate::models::result::EnrichedResult;
use crate::services::history::HistoryRecorder;

/// Postgres-backed history recorder.
///
/// Stores the normalized request plus the full enriched result list as JSON,
/// one row per recommendation run.
#[derive(Clone)]
pub struct PgHistoryRecorder {
    pool: PgPool,
}

impl PgHistoryRecorder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryRecorder for PgHistoryRecorder {
    async fn record(
        &self,
        caller: CallerId,
        request: &RecommendationRequest,
        results: &[EnrichedResult],
    ) -> AppResult<()> {
        let recommended = serde_json::to_value(results)
            .map_err(|e| AppError::Internal(format!("failed to serialize results: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO history (user_id, source, instrument, start_sec, end_sec, recommended, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(caller.0)
        .bind(request.source.label())
        .bind(request.primary_instrument().as_str())
        .bind(request.window.start_sec)
        .bind(request.window.end_sec)
        .bind(recommended)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::info!(
            caller_id = caller.0,
            results = results.len(),
            "Recommendation history recorded"
        );
        Ok(())
    }
}
