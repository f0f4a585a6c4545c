//! Request wrapper carrying per-request out-of-band tags.
//!
//! The client address and the locals bag travel with the request rather
//! than with the API context, so any holder of the request (or of a
//! clone of it) can read and write them.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::HOST;
use http::{HeaderMap, Method};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use url::Url;

use crate::error::RenderError;

const FALLBACK_ORIGIN: &str = "http://localhost";

#[derive(Debug, Default)]
struct RequestTags {
    client_address: RwLock<Option<String>>,
    locals: RwLock<Option<Value>>,
}

/// An incoming request plus its out-of-band tags.
///
/// Cloning is cheap and clones share the same tags.
#[derive(Clone)]
pub struct RouteRequest {
    inner: Arc<http::Request<Bytes>>,
    url: Url,
    tags: Arc<RequestTags>,
}

impl fmt::Debug for RouteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRequest")
            .field("method", self.inner.method())
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl RouteRequest {
    /// Wrap a request, deriving its absolute URL.
    ///
    /// Absolute URIs are used as-is; origin-form URIs are resolved
    /// against the `Host` header, or `http://localhost` without one.
    pub fn new(request: http::Request<Bytes>) -> Result<Self, RenderError> {
        let uri = request.uri();
        let url = if uri.scheme().is_some() && uri.authority().is_some() {
            Url::parse(&uri.to_string())?
        } else {
            let origin = request
                .headers()
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .map(|host| format!("http://{host}"))
                .unwrap_or_else(|| FALLBACK_ORIGIN.to_string());
            resolve_against(&origin, &request)?
        };

        Ok(Self::from_parts(request, url))
    }

    /// Wrap a request, resolving its URI against an explicit origin.
    pub fn with_origin(request: http::Request<Bytes>, origin: &str) -> Result<Self, RenderError> {
        let url = resolve_against(origin, &request)?;
        Ok(Self::from_parts(request, url))
    }

    fn from_parts(request: http::Request<Bytes>, url: Url) -> Self {
        Self {
            inner: Arc::new(request),
            url,
            tags: Arc::new(RequestTags::default()),
        }
    }

    /// Pre-seed the locals bag, as a host shim would before rendering.
    pub fn with_locals(self, locals: Map<String, Value>) -> Self {
        *self.tags.locals.write() = Some(Value::Object(locals));
        self
    }

    /// Pre-seed the client address.
    pub fn with_client_address(self, address: impl Into<String>) -> Self {
        self.set_client_address(address);
        self
    }

    /// The underlying HTTP request.
    pub fn inner(&self) -> &http::Request<Bytes> {
        &self.inner
    }

    /// Absolute request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.inner.body()
    }

    /// Client network address, if the network layer supplied one.
    pub fn client_address(&self) -> Option<String> {
        self.tags.client_address.read().clone()
    }

    /// Record the client network address.
    pub fn set_client_address(&self, address: impl Into<String>) {
        *self.tags.client_address.write() = Some(address.into());
    }

    /// Current locals value, `None` until something is stored.
    pub fn locals(&self) -> Option<Value> {
        self.tags.locals.read().clone()
    }

    /// Store a locals value. Validation is the API context's job.
    pub(crate) fn store_locals(&self, locals: Value) {
        *self.tags.locals.write() = Some(locals);
    }
}

fn resolve_against(origin: &str, request: &http::Request<Bytes>) -> Result<Url, RenderError> {
    let base = Url::parse(origin)?;
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    Ok(base.join(path_and_query)?)
}
