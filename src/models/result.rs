use serde::{Deserialize, Serialize};

use super::request::Instrument;

/// Final result record returned to the caller.
///
/// Order within a response always matches the inference service's ranking;
/// the pipeline never re-sorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedResult {
    pub title: String,
    pub artist: String,
    /// Normalized similarity in `[0, 1]`, 1 being a perfect match
    pub similarity: f64,
    pub instrument: Instrument,
    pub start_sec: f64,
    pub end_sec: f64,
    pub album_cover_url: Option<String>,
    pub video_id: Option<String>,
}
