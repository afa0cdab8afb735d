use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::request::{
    AudioSource, CallerId, Instrument, RecommendationRequest, TimeWindow, DEFAULT_TOP_K,
};
use crate::models::result::EnrichedResult;

use super::AppState;

// Request/Response types

/// Instrument selection, accepted as a single tag or a list of tags
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InstrumentSelector {
    One(String),
    Many(Vec<String>),
}

impl InstrumentSelector {
    /// Parses into known instrument tags, deduplicated, order preserved
    fn into_instruments(self) -> AppResult<Vec<Instrument>> {
        let raw = match self {
            InstrumentSelector::One(tag) => vec![tag],
            InstrumentSelector::Many(tags) => tags,
        };
        let mut instruments = Vec::with_capacity(raw.len());
        for tag in raw {
            let instrument: Instrument = tag.parse()?;
            if !instruments.contains(&instrument) {
                instruments.push(instrument);
            }
        }
        Ok(instruments)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendBody {
    pub source_url: String,
    #[serde(alias = "instrument")]
    pub instruments: InstrumentSelector,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default)]
    pub top_k: Option<u32>,
}

/// Selector part of a multipart upload request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSelectors {
    #[serde(alias = "instrument")]
    pub instruments: InstrumentSelector,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default)]
    pub top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub status: &'static str,
    pub is_logged_in: bool,
    pub history_saved: bool,
    pub results: Vec<EnrichedResult>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Recommendation for a remote audio source (JSON body)
pub async fn recommend(
    State(state): State<AppState>,
    caller: Option<Extension<CallerId>>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<Json<RecommendResponse>> {
    let body: RecommendBody = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("malformed request body: {}", e)))?;

    let request = RecommendationRequest {
        source: AudioSource::Remote {
            url: body.source_url,
        },
        instruments: body.instruments.into_instruments()?,
        window: TimeWindow::new(body.start_sec, body.end_sec),
        top_k: body.top_k.unwrap_or(DEFAULT_TOP_K),
        caller: caller.map(|Extension(id)| id),
    };

    run_pipeline(&state, request).await
}

/// Recommendation for an uploaded clip (multipart: `request` JSON part plus
/// `file` audio part)
pub async fn recommend_upload(
    State(state): State<AppState>,
    caller: Option<Extension<CallerId>>,
    mut multipart: Multipart,
) -> AppResult<Json<RecommendResponse>> {
    let mut selectors: Option<UploadSelectors> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("request") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable request part: {}", e)))?;
                selectors = Some(serde_json::from_str(&text).map_err(|e| {
                    AppError::Validation(format!("malformed request part: {}", e))
                })?);
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("upload.wav")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("unreadable file part: {}", e)))?;
                upload = Some((file_name, data.to_vec()));
            }
            _ => {}
        }
    }

    let selectors =
        selectors.ok_or_else(|| AppError::Validation("missing 'request' part".to_string()))?;
    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("missing 'file' part".to_string()))?;

    let request = RecommendationRequest {
        source: AudioSource::Upload { file_name, data },
        instruments: selectors.instruments.into_instruments()?,
        window: TimeWindow::new(selectors.start_sec, selectors.end_sec),
        top_k: selectors.top_k.unwrap_or(DEFAULT_TOP_K),
        caller: caller.map(|Extension(id)| id),
    };

    run_pipeline(&state, request).await
}

async fn run_pipeline(
    state: &AppState,
    request: RecommendationRequest,
) -> AppResult<Json<RecommendResponse>> {
    let outcome = state.recommender.recommend(request).await?;

    Ok(Json(RecommendResponse {
        status: "success",
        is_logged_in: outcome.is_authenticated,
        history_saved: outcome.history_saved,
        results: outcome.results,
    }))
}
