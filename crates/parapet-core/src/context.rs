//! Per-request capability object handed to pages, endpoints and middleware.

use http::StatusCode;
use serde_json::{Map, Value};
use url::Url;

use crate::cookies::CookieJar;
use crate::error::RenderError;
use crate::request::RouteRequest;
use crate::response::{self, Response};
use crate::route::Params;

/// Arbitrary props supplied by the caller.
pub type Props = Map<String, Value>;

/// Generator tag exposed to user code.
pub const GENERATOR: &str = concat!("Parapet v", env!("CARGO_PKG_VERSION"));

/// Inputs to [`create_api_context`].
#[derive(Debug, Clone)]
pub struct CreateApiContext {
    pub request: RouteRequest,
    pub params: Params,
    /// Configured site, parsed into a URL when present.
    pub site: Option<String>,
    pub route_url: Url,
    pub props: Props,
    /// Name of the hosting adapter, used in error messages.
    pub adapter_name: Option<String>,
}

/// Everything user code can see about the current request.
///
/// Created once per render and never shared across requests. Clones
/// share the cookie jar and the request tags.
#[derive(Debug, Clone)]
pub struct ApiContext {
    request: RouteRequest,
    params: Params,
    site: Option<Url>,
    props: Props,
    url: Url,
    cookies: CookieJar,
    adapter_name: Option<String>,
}

/// Build the context for one request.
///
/// Only fails when `site` is set but is not a valid URL. Availability
/// of `client_address` and validity of `locals` are checked on access.
pub fn create_api_context(payload: CreateApiContext) -> Result<ApiContext, RenderError> {
    let site = payload.site.as_deref().map(Url::parse).transpose()?;

    Ok(ApiContext {
        cookies: CookieJar::new(&payload.request),
        request: payload.request,
        params: payload.params,
        site,
        props: payload.props,
        url: payload.route_url,
        adapter_name: payload.adapter_name,
    })
}

impl ApiContext {
    pub fn request(&self) -> &RouteRequest {
        &self.request
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Configured site; `None` when the environment has none.
    pub fn site(&self) -> Option<&Url> {
        self.site.as_ref()
    }

    pub fn generator(&self) -> &'static str {
        GENERATOR
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// URL of the route being rendered.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Body-less redirect response; status defaults to 302.
    pub fn redirect(&self, path: &str, status: Option<StatusCode>) -> Result<Response, RenderError> {
        response::redirect(path, status.unwrap_or(StatusCode::FOUND))
    }

    /// Client network address as tagged on the request by the server.
    pub fn client_address(&self) -> Result<String, RenderError> {
        match self.request.client_address() {
            Some(address) => Ok(address),
            None => match &self.adapter_name {
                Some(adapter) => Err(RenderError::ClientAddressNotAvailable {
                    adapter: adapter.clone(),
                }),
                None => Err(RenderError::StaticClientAddressNotAvailable),
            },
        }
    }

    /// Current locals bag, shared with middleware through the request.
    pub fn locals(&self) -> Option<Value> {
        self.request.locals()
    }

    /// Replace the locals bag. Only JSON objects are accepted.
    pub fn set_locals(&self, locals: Value) -> Result<(), RenderError> {
        if !locals.is_object() {
            return Err(RenderError::LocalsNotAnObject {
                found: json_type_name(&locals),
            });
        }
        self.request.store_locals(locals);
        Ok(())
    }

    /// Read a single key of the locals bag.
    pub fn local(&self, key: &str) -> Option<Value> {
        self.locals().and_then(|locals| locals.get(key).cloned())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
