//! Response type and small constructors.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderName, HeaderValue, StatusCode};

use crate::error::RenderError;

/// Fully buffered HTTP response produced by the pipeline.
pub type Response = http::Response<Bytes>;

/// Header used by lower layers to signal "no matching content"
/// (`X-Astro-Response` on the wire).
pub const RESPONSE_SENTINEL_HEADER: HeaderName = HeaderName::from_static("x-astro-response");

/// Sentinel value asking the SSR pipeline to render a 404 instead.
pub const NOT_FOUND_SENTINEL: &str = "Not-Found";

/// Body-less redirect to `location`.
pub fn redirect(location: &str, status: StatusCode) -> Result<Response, RenderError> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(LOCATION, HeaderValue::from_str(location)?);
    Ok(response)
}

/// `text/html` response with status 200.
pub fn html(body: impl Into<Bytes>) -> Response {
    with_content_type(body.into(), "text/html; charset=utf-8")
}

/// `text/plain` response with status 200.
pub fn text(body: impl Into<Bytes>) -> Response {
    with_content_type(body.into(), "text/plain; charset=utf-8")
}

/// Response carrying the not-found sentinel header.
pub fn not_found_sentinel() -> Response {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        RESPONSE_SENTINEL_HEADER,
        HeaderValue::from_static(NOT_FOUND_SENTINEL),
    );
    response
}

/// Whether a response carries the not-found sentinel.
pub fn is_not_found_sentinel(response: &Response) -> bool {
    response
        .headers()
        .get(&RESPONSE_SENTINEL_HEADER)
        .is_some_and(|value| value == NOT_FOUND_SENTINEL)
}

fn with_content_type(body: Bytes, content_type: &'static str) -> Response {
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_location_and_status() {
        let response = redirect("/login", StatusCode::FOUND).unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[LOCATION], "/login");
        assert!(response.body().is_empty());
    }

    #[test]
    fn redirect_rejects_invalid_location() {
        let err = redirect("/bad\nheader", StatusCode::FOUND).unwrap_err();
        assert!(matches!(err, RenderError::InvalidHeader(_)));
    }

    #[test]
    fn html_and_text_content_types() {
        assert_eq!(html("<p>hi</p>").headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(text("hi").headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_not_found_sentinel(&not_found_sentinel()));
        assert!(!is_not_found_sentinel(&text("ok")));
    }
}
