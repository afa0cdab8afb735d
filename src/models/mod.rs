pub mod catalog;
pub mod inference;
pub mod request;
pub mod result;

pub use catalog::CatalogEntry;
pub use inference::InferenceMatch;
pub use request::{AudioSource, CallerId, Instrument, RecommendationRequest, TimeWindow};
pub use result::EnrichedResult;
