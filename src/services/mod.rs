pub mod catalog;
pub mod enricher;
pub mod history;
pub mod inference;
pub mod metadata;
pub mod recommend;
pub mod stager;

pub use catalog::CatalogLookup;
pub use enricher::Enricher;
pub use history::HistoryRecorder;
pub use inference::{HttpInferenceClient, InferenceClient, InferenceSource};
pub use metadata::{ItunesMetadataProvider, MetadataProvider};
pub use recommend::{RecommendationOutcome, RecommendationService};
pub use stager::{MediaLifecycle, MediaStager, StagedMedia};
