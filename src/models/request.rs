use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Instrument stems the inference service can search on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Drums,
    Vocals,
    Bass,
    Guitar,
    Piano,
    Other,
}

impl Instrument {
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Drums => "drums",
            Instrument::Vocals => "vocals",
            Instrument::Bass => "bass",
            Instrument::Guitar => "guitar",
            Instrument::Piano => "piano",
            Instrument::Other => "other",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drums" => Ok(Instrument::Drums),
            "vocals" => Ok(Instrument::Vocals),
            "bass" => Ok(Instrument::Bass),
            "guitar" => Ok(Instrument::Guitar),
            "piano" => Ok(Instrument::Piano),
            "other" => Ok(Instrument::Other),
            other => Err(AppError::Validation(format!(
                "unknown instrument '{}' (expected one of drums, vocals, bass, guitar, piano, other)",
                other
            ))),
        }
    }
}

/// Half-open analysis window `[start_sec, end_sec)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TimeWindow {
    pub fn new(start_sec: f64, end_sec: f64) -> Self {
        Self { start_sec, end_sec }
    }

    pub fn duration(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    /// Structural checks, run before any file I/O or external call
    pub fn validate(&self, max_window_sec: f64) -> AppResult<()> {
        if !self.start_sec.is_finite() || !self.end_sec.is_finite() {
            return Err(AppError::Validation(
                "startSec and endSec must be finite numbers".to_string(),
            ));
        }
        if self.start_sec < 0.0 {
            return Err(AppError::Validation(format!(
                "startSec must be >= 0, got {}",
                self.start_sec
            )));
        }
        if self.end_sec <= self.start_sec {
            return Err(AppError::Validation(format!(
                "endSec ({}) must be greater than startSec ({})",
                self.end_sec, self.start_sec
            )));
        }
        if self.duration() > max_window_sec {
            return Err(AppError::Validation(format!(
                "window of {:.1}s exceeds the maximum of {:.1}s",
                self.duration(),
                max_window_sec
            )));
        }
        Ok(())
    }
}

/// Identity of an authenticated caller, resolved by the outer auth layer.
/// The pipeline only cares whether one is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerId(pub i64);

/// Where the audio to analyze comes from
#[derive(Clone)]
pub enum AudioSource {
    /// Remote link the inference service fetches itself
    Remote { url: String },
    /// Uploaded clip, staged locally before it is sent
    Upload { file_name: String, data: Vec<u8> },
}

impl AudioSource {
    pub fn is_upload(&self) -> bool {
        matches!(self, AudioSource::Upload { .. })
    }

    /// Human-readable reference to the source, for logs and history records
    pub fn label(&self) -> &str {
        match self {
            AudioSource::Remote { url } => url,
            AudioSource::Upload { file_name, .. } => file_name,
        }
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Remote { url } => f.debug_struct("Remote").field("url", url).finish(),
            AudioSource::Upload { file_name, data } => f
                .debug_struct("Upload")
                .field("file_name", file_name)
                .field("bytes", &data.len())
                .finish(),
        }
    }
}

pub const DEFAULT_TOP_K: u32 = 5;

/// Normalized recommendation request, one per pipeline invocation
#[derive(Debug, Clone)]
pub struct RecommendationRequest {
    pub source: AudioSource,
    pub instruments: Vec<Instrument>,
    pub window: TimeWindow,
    pub top_k: u32,
    pub caller: Option<CallerId>,
}

impl RecommendationRequest {
    /// The instrument fallback used when an inference match carries none
    pub fn primary_instrument(&self) -> Instrument {
        self.instruments.first().copied().unwrap_or(Instrument::Other)
    }

    pub fn validate(&self, max_window_sec: f64, top_k_max: u32) -> AppResult<()> {
        if let AudioSource::Remote { url } = &self.source {
            if url.trim().is_empty() {
                return Err(AppError::Validation("source URL must not be empty".to_string()));
            }
        }
        if self.instruments.is_empty() {
            return Err(AppError::Validation(
                "at least one instrument must be selected".to_string(),
            ));
        }
        self.window.validate(max_window_sec)?;
        if self.top_k == 0 || self.top_k > top_k_max {
            return Err(AppError::Validation(format!(
                "topK must be between 1 and {}, got {}",
                top_k_max, self.top_k
            )));
        }
        Ok(())
    }
}
