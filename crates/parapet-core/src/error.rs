//! Error types for the rendering pipeline.

use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while rendering a route.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An endpoint route was rendered but no endpoint-result handler is set.
    #[error("you must set the endpoint handler before rendering endpoint routes")]
    MissingEndpointHandler,

    /// The component does not match the kind of route being rendered.
    #[error("route '{route}' expects {expected}")]
    ComponentMismatch {
        route: String,
        expected: &'static str,
    },

    /// A structured endpoint payload was produced for a route that cannot translate it.
    #[error("structured endpoint result cannot be returned for a {route_type} route")]
    UnexpectedEndpointResult { route_type: String },

    /// The route cache can only be cleared by the development pipeline.
    #[error("the route cache cannot be cleared in {mode} mode")]
    RouteCacheUnavailable { mode: String },

    /// The adapter in use does not provide the client address.
    #[error("`clientAddress` is not available in the `{adapter}` adapter")]
    ClientAddressNotAvailable { adapter: String },

    /// The client address was requested on a static (non-served) page.
    #[error("`clientAddress` is only available on server-rendered routes")]
    StaticClientAddressNotAvailable,

    /// A non-object value was assigned to `locals`.
    #[error("`locals` can only be assigned to an object, received {found}")]
    LocalsNotAnObject { found: &'static str },

    /// Middleware returned a structured payload where a response was required.
    #[error("middleware must return a response when rendering a page")]
    MiddlewareNotAResponse,

    /// The sentinel not-found response reached the SSR endpoint handler.
    #[error("no content matched the request")]
    NotFound,

    /// A URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A header name or value could not be encoded.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A cookie name is not a valid HTTP token.
    #[error("invalid cookie name '{0}'")]
    InvalidCookieName(String),

    /// The environment base path is empty.
    #[error("`base` must not be empty")]
    EmptyBase,

    /// Error raised by user code (handler, page or middleware).
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl RenderError {
    /// Returns true for the sentinel not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RenderError::NotFound)
    }

    /// Status code the outer serving layer should answer with.
    pub fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<url::ParseError> for RenderError {
    fn from(err: url::ParseError) -> Self {
        RenderError::InvalidUrl(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for RenderError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        RenderError::InvalidHeader(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = RenderError::NotFound;
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_errors_map_to_500() {
        let errs = [
            RenderError::MissingEndpointHandler,
            RenderError::StaticClientAddressNotAvailable,
            RenderError::Handler(anyhow::anyhow!("boom")),
        ];
        for err in errs {
            assert!(!err.is_not_found());
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn client_address_message_names_adapter() {
        let err = RenderError::ClientAddressNotAvailable {
            adapter: "edge-functions".into(),
        };
        assert!(err.to_string().contains("edge-functions"));
    }

    #[test]
    fn handler_error_is_transparent() {
        let err = RenderError::from(anyhow::anyhow!("database unavailable"));
        assert_eq!(err.to_string(), "database unavailable");
    }
}
