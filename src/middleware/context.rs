use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::models::request::CallerId;

/// HTTP header carrying the request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP header carrying the resolved caller identity.
///
/// Session/token validation happens in the outer auth layer; by the time a
/// request reaches this service the identity is just a header. Anonymous
/// requests simply omit it and still get recommendations.
pub const CALLER_ID_HEADER: &str = "x-caller-id";

/// Correlation ID for a single request, carried in request extensions and
/// echoed back on the response
#[derive(Clone, Debug)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn extract_request_id(request: &Request) -> RequestId {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(RequestId)
        .unwrap_or_else(|| RequestId(Uuid::new_v4()))
}

fn extract_caller(request: &Request) -> Option<CallerId> {
    request
        .headers()
        .get(CALLER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(CallerId)
}

/// Middleware establishing per-request context.
///
/// Lifts the correlation ID (reused from the incoming header when it is a
/// valid UUID, freshly generated otherwise) and the optional caller identity
/// into request extensions, and echoes the correlation ID on the response.
/// A malformed caller header is treated as anonymous.
pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let request_id = extract_request_id(&request);
    request.extensions_mut().insert(request_id.clone());

    if let Some(caller) = extract_caller(&request) {
        request.extensions_mut().insert(caller);
    }

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Span for the HTTP trace layer, tagged with the correlation ID and the
/// caller (when one is present)
pub fn make_request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let caller_id = request.extensions().get::<CallerId>().map(|c| c.0);

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
        caller_id = ?caller_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_header(name: &str, value: &str) -> Request {
        axum::http::Request::builder()
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_valid_request_id_header_is_reused() {
        let id = Uuid::new_v4();
        let request = request_with_header(REQUEST_ID_HEADER, &id.to_string());
        assert_eq!(extract_request_id(&request).0, id);
    }

    #[test]
    fn test_malformed_request_id_header_gets_fresh_id() {
        let request = request_with_header(REQUEST_ID_HEADER, "not-a-uuid");
        let generated = extract_request_id(&request);
        assert_ne!(generated.to_string(), "not-a-uuid");
    }

    #[test]
    fn test_caller_header_parsed() {
        let request = request_with_header(CALLER_ID_HEADER, "42");
        assert_eq!(extract_caller(&request), Some(CallerId(42)));
    }

    #[test]
    fn test_malformed_caller_header_is_anonymous() {
        let request = request_with_header(CALLER_ID_HEADER, "forty-two");
        assert_eq!(extract_caller(&request), None);
    }

    #[test]
    fn test_absent_caller_header_is_anonymous() {
        let request = axum::http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_caller(&request), None);
    }
}
