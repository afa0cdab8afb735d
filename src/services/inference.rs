use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::inference::InferenceMatch;
use crate::models::request::RecommendationRequest;

/// What actually gets shipped to the inference service
#[derive(Debug, Clone)]
pub enum InferenceSource {
    /// Remote link the service fetches and processes itself
    Remote { url: String },
    /// Pre-staged local artifact, uploaded alongside the selectors
    Staged { path: PathBuf },
}

/// Client for the external audio similarity service.
///
/// The service is an opaque wire-level dependency: it receives the selector
/// payload plus the audio (or a descriptor for it) and returns ranked
/// matches. Failures are surfaced, never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Whether an endpoint is configured at all. Checked before staging so an
    /// unconfigured deployment fails without side effects.
    fn is_configured(&self) -> bool;

    async fn infer(
        &self,
        request: &RecommendationRequest,
        source: &InferenceSource,
    ) -> AppResult<Vec<InferenceMatch>>;
}

/// Response envelope of the inference service
#[derive(Debug, Deserialize)]
struct InferenceEnvelope {
    status: String,
    #[serde(default)]
    results: Option<Vec<InferenceMatch>>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP implementation of [`InferenceClient`]
#[derive(Clone)]
pub struct HttpInferenceClient {
    http_client: HttpClient,
    endpoint: Option<String>,
    /// Timeout for pre-staged local audio
    local_timeout: Duration,
    /// Timeout for remote sources that need a server-side fetch first
    remote_timeout: Duration,
}

impl HttpInferenceClient {
    pub fn new(
        endpoint: Option<String>,
        local_timeout: Duration,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint,
            local_timeout,
            remote_timeout,
        }
    }

    /// Instrument selector: a single selection is sent as a plain string,
    /// multiple selections as an array
    fn instrument_selector(request: &RecommendationRequest) -> serde_json::Value {
        if request.instruments.len() == 1 {
            json!(request.instruments[0])
        } else {
            json!(request.instruments)
        }
    }

    fn parse_envelope(body: &str) -> AppResult<Vec<InferenceMatch>> {
        let envelope: InferenceEnvelope = serde_json::from_str(body).map_err(|e| {
            AppError::UpstreamUnavailable(format!("malformed inference response: {}", e))
        })?;

        match (envelope.status.as_str(), envelope.results) {
            ("success", Some(results)) => Ok(results),
            ("error", _) => Err(AppError::UpstreamUnavailable(
                envelope
                    .message
                    .unwrap_or_else(|| "inference service reported an error".to_string()),
            )),
            _ => Err(AppError::UpstreamUnavailable(format!(
                "unexpected inference response envelope (status '{}')",
                envelope.status
            ))),
        }
    }

    fn transport_error(e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::UpstreamUnavailable("inference request timed out".to_string())
        } else {
            AppError::UpstreamUnavailable(format!("inference request failed: {}", e))
        }
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    async fn infer(
        &self,
        request: &RecommendationRequest,
        source: &InferenceSource,
    ) -> AppResult<Vec<InferenceMatch>> {
        let endpoint = self.endpoint.as_deref().ok_or(AppError::NotConfigured)?;
        let url = format!("{}/recommend", endpoint.trim_end_matches('/'));

        let response = match source {
            InferenceSource::Remote { url: source_url } => {
                let payload = json!({
                    "source": source_url,
                    "instrument": Self::instrument_selector(request),
                    "start_sec": request.window.start_sec,
                    "end_sec": request.window.end_sec,
                    "top_k": request.top_k,
                });

                self.http_client
                    .post(&url)
                    .timeout(self.remote_timeout)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(Self::transport_error)?
            }
            InferenceSource::Staged { path } => {
                let audio = tokio::fs::read(path).await.map_err(|e| {
                    AppError::MediaProcessing(format!("failed to read staged artifact: {}", e))
                })?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "clip.wav".to_string());

                let mut form = reqwest::multipart::Form::new()
                    .part(
                        "file",
                        reqwest::multipart::Part::bytes(audio)
                            .file_name(file_name)
                            .mime_str("audio/wav")
                            .map_err(|e| AppError::Internal(e.to_string()))?,
                    )
                    .text("start_sec", request.window.start_sec.to_string())
                    .text("end_sec", request.window.end_sec.to_string())
                    .text("top_k", request.top_k.to_string());
                for instrument in &request.instruments {
                    form = form.text("instrument", instrument.as_str());
                }

                self.http_client
                    .post(&url)
                    .timeout(self.local_timeout)
                    .multipart(form)
                    .send()
                    .await
                    .map_err(Self::transport_error)?
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;
        if !status.is_success() {
            return Err(AppError::UpstreamUnavailable(format!(
                "inference service returned status {}: {}",
                status, body
            )));
        }

        let results = Self::parse_envelope(&body)?;
        tracing::info!(
            matches = results.len(),
            source = ?source_kind(source),
            "Inference completed"
        );
        Ok(results)
    }
}

fn source_kind(source: &InferenceSource) -> &'static str {
    match source {
        InferenceSource::Remote { .. } => "remote",
        InferenceSource::Staged { .. } => "staged",
    }
}
