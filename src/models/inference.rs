use serde::Deserialize;

/// One raw match from the inference service.
///
/// The service reports either a native `similarity` in `[0, 1]` or a
/// `distance >= 0`; window and instrument may be absent, in which case the
/// enricher falls back to the values from the originating request.
#[derive(Debug, Clone, Deserialize)]
pub struct InferenceMatch {
    #[serde(default)]
    pub id: Option<i64>,
    /// Free-text label, conventionally "title - artist"
    #[serde(default, rename = "song_name")]
    pub raw_label: Option<String>,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub start_sec: Option<f64>,
    #[serde(default)]
    pub end_sec: Option<f64>,
}

impl InferenceMatch {
    /// Normalizes the raw score to a similarity in `[0, 1]`.
    ///
    /// A native similarity passes through unchanged; a distance `d` maps to
    /// `1 - d`, clamped at zero for distances past 1. A match with neither
    /// score reads as no similarity at all.
    pub fn normalized_similarity(&self) -> f64 {
        if let Some(similarity) = self.similarity {
            similarity
        } else if let Some(distance) = self.distance {
            (1.0 - distance).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_with(similarity: Option<f64>, distance: Option<f64>) -> InferenceMatch {
        InferenceMatch {
            id: None,
            raw_label: None,
            similarity,
            distance,
            instrument: None,
            start_sec: None,
            end_sec: None,
        }
    }

    #[test]
    fn test_native_similarity_passes_through() {
        assert_eq!(match_with(Some(0.92), None).normalized_similarity(), 0.92);
    }

    #[test]
    fn test_similarity_preferred_over_distance() {
        assert_eq!(
            match_with(Some(0.5), Some(0.1)).normalized_similarity(),
            0.5
        );
    }

    #[test]
    fn test_distance_converts_to_similarity() {
        assert_eq!(match_with(None, Some(0.25)).normalized_similarity(), 0.75);
        assert_eq!(match_with(None, Some(0.0)).normalized_similarity(), 1.0);
    }

    #[test]
    fn test_large_distance_clamps_to_zero() {
        assert_eq!(match_with(None, Some(2.5)).normalized_similarity(), 0.0);
    }

    #[test]
    fn test_missing_scores_read_as_zero() {
        assert_eq!(match_with(None, None).normalized_similarity(), 0.0);
    }

    #[test]
    fn test_deserializes_similarity_shape() {
        let m: InferenceMatch = serde_json::from_str(
            r#"{"id": 7, "song_name": "Dynamite - BTS", "similarity": 0.98,
                "instrument": "drums", "start_sec": 10.0, "end_sec": 40.0}"#,
        )
        .unwrap();
        assert_eq!(m.id, Some(7));
        assert_eq!(m.raw_label.as_deref(), Some("Dynamite - BTS"));
        assert_eq!(m.normalized_similarity(), 0.98);
    }

    #[test]
    fn test_deserializes_distance_shape_with_sparse_fields() {
        let m: InferenceMatch =
            serde_json::from_str(r#"{"song_name": "Butter - BTS", "distance": 0.1}"#).unwrap();
        assert_eq!(m.instrument, None);
        assert_eq!(m.start_sec, None);
        assert!((m.normalized_similarity() - 0.9).abs() < 1e-9);
    }
}
