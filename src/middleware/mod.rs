pub mod context;

pub use context::{make_request_span, request_context_middleware, RequestId};
