use std::sync::Arc;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::request::{AudioSource, RecommendationRequest};
use crate::models::result::EnrichedResult;
use crate::services::enricher::Enricher;
use crate::services::history::HistoryRecorder;
use crate::services::inference::{InferenceClient, InferenceSource};
use crate::services::stager::MediaStager;

/// Outcome of a completed pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationOutcome {
    pub results: Vec<EnrichedResult>,
    pub history_saved: bool,
    pub is_authenticated: bool,
}

/// End-to-end recommendation pipeline.
///
/// Validating → Staging → Inferring → Enriching → (RecordingHistory) → Done,
/// failing out of any stage with a typed error. Staged media is released on
/// every exit path past staging; enrichment and history recording never fail
/// the run.
pub struct RecommendationService {
    stager: MediaStager,
    inference: Arc<dyn InferenceClient>,
    enricher: Enricher,
    history: Arc<dyn HistoryRecorder>,
    max_window_sec: f64,
    top_k_max: u32,
}

impl RecommendationService {
    pub fn new(
        stager: MediaStager,
        inference: Arc<dyn InferenceClient>,
        enricher: Enricher,
        history: Arc<dyn HistoryRecorder>,
        max_window_sec: f64,
        top_k_max: u32,
    ) -> Self {
        Self {
            stager,
            inference,
            enricher,
            history,
            max_window_sec,
            top_k_max,
        }
    }

    pub async fn recommend(
        &self,
        request: RecommendationRequest,
    ) -> AppResult<RecommendationOutcome> {
        // Validating: no side effects before this passes
        request.validate(self.max_window_sec, self.top_k_max)?;

        // fail fast before any staging when no endpoint is deployed
        if !self.inference.is_configured() {
            return Err(AppError::NotConfigured);
        }

        // Staging: uploads are materialized and trimmed, remote sources pass through
        let mut staged = self.stager.stage(&request.source, request.window)?;
        let source = match (&request.source, staged.artifact_path()) {
            (AudioSource::Remote { url }, _) => InferenceSource::Remote { url: url.clone() },
            (AudioSource::Upload { .. }, Some(path)) => InferenceSource::Staged {
                path: path.to_path_buf(),
            },
            (AudioSource::Upload { .. }, None) => {
                staged.release();
                return Err(AppError::Internal("staged artifact missing".to_string()));
            }
        };

        // Inferring: staged media is released whether or not the call succeeds
        let inference_outcome = self.inference.infer(&request, &source).await;
        if inference_outcome.is_ok() {
            staged.mark_sent();
        }
        staged.release();
        let matches = inference_outcome?;

        // Enriching: degraded records instead of failures
        let results = self
            .enricher
            .enrich(matches, request.window, &request.instruments)
            .await;

        // RecordingHistory: authenticated callers only, log-only on failure
        let mut history_saved = false;
        if let Some(caller) = request.caller {
            match self.history.record(caller, &request, &results).await {
                Ok(()) => history_saved = true,
                Err(e) => {
                    tracing::warn!(
                        caller_id = caller.0,
                        error = %e,
                        "History write failed, returning recommendation anyway"
                    );
                }
            }
        }

        tracing::info!(
            results = results.len(),
            history_saved,
            authenticated = request.caller.is_some(),
            "Recommendation pipeline completed"
        );

        Ok(RecommendationOutcome {
            results,
            history_saved,
            is_authenticated: request.caller.is_some(),
        })
    }
}
