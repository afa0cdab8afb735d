use std::sync::Arc;

use crate::models::catalog::CatalogEntry;
use crate::models::inference::InferenceMatch;
use crate::models::request::{Instrument, TimeWindow};
use crate::models::result::EnrichedResult;
use crate::services::catalog::CatalogLookup;
use crate::services::metadata::MetadataProvider;

const UNKNOWN: &str = "Unknown";

/// Splits a raw match label into candidate title and artist.
///
/// Labels conventionally read "title - artist"; the split happens once, so a
/// title containing " - " keeps everything after the first separator as the
/// artist side.
fn split_label(raw: &str) -> (Option<String>, Option<String>) {
    let raw = raw.trim();
    if raw.is_empty() {
        return (None, None);
    }
    match raw.split_once(" - ") {
        Some((title, artist)) => {
            let title = title.trim();
            let artist = artist.trim();
            (
                (!title.is_empty()).then(|| title.to_string()),
                (!artist.is_empty()).then(|| artist.to_string()),
            )
        }
        None => (Some(raw.to_string()), None),
    }
}

/// Joins raw inference matches with the catalog and the metadata provider to
/// build the final result records.
///
/// Order-preserving, and never fails: a match that resolves nowhere degrades
/// to "Unknown" fields instead of raising.
pub struct Enricher {
    catalog: Arc<dyn CatalogLookup>,
    metadata: Arc<dyn MetadataProvider>,
}

impl Enricher {
    pub fn new(catalog: Arc<dyn CatalogLookup>, metadata: Arc<dyn MetadataProvider>) -> Self {
        Self { catalog, metadata }
    }

    /// A match that carries no recognizable instrument tag falls back to the
    /// first requested instrument
    pub async fn enrich(
        &self,
        matches: Vec<InferenceMatch>,
        fallback_window: TimeWindow,
        fallback_instruments: &[Instrument],
    ) -> Vec<EnrichedResult> {
        let fallback_instrument = fallback_instruments
            .first()
            .copied()
            .unwrap_or(Instrument::Other);
        let mut results = Vec::with_capacity(matches.len());
        for m in matches {
            results
                .push(self.enrich_one(m, fallback_window, fallback_instrument).await);
        }
        results
    }

    async fn enrich_one(
        &self,
        m: InferenceMatch,
        fallback_window: TimeWindow,
        fallback_instrument: Instrument,
    ) -> EnrichedResult {
        let similarity = m.normalized_similarity();
        let (start_sec, end_sec) = match (m.start_sec, m.end_sec) {
            (Some(start), Some(end)) => (start, end),
            _ => (fallback_window.start_sec, fallback_window.end_sec),
        };
        let instrument = m
            .instrument
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or(fallback_instrument);

        let raw_label = m.raw_label.as_deref().unwrap_or("");
        let (parsed_title, parsed_artist) = split_label(raw_label);

        let entry = match &parsed_title {
            Some(title) => self.resolve(title, parsed_artist.as_deref()).await,
            None => None,
        };

        let (title, artist, album_cover_url, video_id) = match (entry, parsed_title) {
            (Some(entry), _) => {
                let cover = match &entry.album_cover_url {
                    Some(url) if !url.is_empty() => url.clone(),
                    _ => self.metadata.fetch_cover(&entry.title, &entry.artist).await,
                };
                (entry.title, entry.artist, cover, entry.video_id)
            }
            (None, Some(title)) => {
                let artist = parsed_artist.unwrap_or_else(|| UNKNOWN.to_string());
                let cover = self.metadata.fetch_cover(&title, &artist).await;
                (title, artist, cover, None)
            }
            (None, None) => (UNKNOWN.to_string(), UNKNOWN.to_string(), String::new(), None),
        };

        EnrichedResult {
            title,
            artist,
            similarity,
            instrument,
            start_sec,
            end_sec,
            album_cover_url: (!album_cover_url.is_empty()).then_some(album_cover_url),
            video_id,
        }
    }

    /// Catalog lookup chain: exact title first, then title+artist.
    /// Storage errors degrade to "not found" and are only logged.
    async fn resolve(&self, title: &str, artist: Option<&str>) -> Option<CatalogEntry> {
        match self.catalog.find_by_title(title).await {
            Ok(Some(entry)) => return Some(entry),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(title, error = %e, "Catalog lookup by title failed");
                return None;
            }
        }

        if let Some(artist) = artist {
            match self.catalog.find_by_title_and_artist(title, artist).await {
                Ok(entry) => return entry,
                Err(e) => {
                    tracing::warn!(title, artist, error = %e, "Catalog lookup by title and artist failed");
                }
            }
        }

        None
    }
}
