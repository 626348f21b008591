//! Request correlation IDs.
//!
//! An upstream `x-request-id` is reused only when it is a well-formed
//! identifier; anything else is replaced by a fresh UUID v4 (simple form).
//! Handlers run inside a `request` span carrying the ID, the Sentry scope is
//! tagged with it, and it is echoed on the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use charsheet_core::validate_id;
use tracing::Instrument;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Pick the request ID: a valid upstream value, or a new one.
#[must_use]
pub fn request_id_for(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| validate_id(value).is_ok())
        .map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_string)
}

/// Tag the request with a correlation ID and echo it back.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request_id_for(request.headers());

    sentry::configure_scope(|scope| scope.set_tag("request_id", &request_id));

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
