//! Per-request cookie jar.
//!
//! The jar reads the incoming `Cookie` header and records every cookie
//! user code sets or deletes during the render. The recorded cookies are
//! written to the final response exactly once by
//! [`attach_cookies_to_response`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::header::{COOKIE, SET_COOKIE};
use http::HeaderValue;
use parking_lot::Mutex;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::RenderError;
use crate::request::RouteRequest;
use crate::response::Response;

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Bytes that may not appear raw in a cookie value.
const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b',')
    .add(b';')
    .add(b'\\');

/// RFC 7230 `token`: what a cookie name may contain.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

fn checked_name(name: String) -> Result<String, RenderError> {
    if is_token(&name) {
        Ok(name)
    } else {
        Err(RenderError::InvalidCookieName(name))
    }
}

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => f.write_str("Strict"),
            SameSite::Lax => f.write_str("Lax"),
            SameSite::None => f.write_str("None"),
        }
    }
}

/// Attributes of an outgoing cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<Duration>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

#[derive(Debug, Clone)]
struct OutgoingCookie {
    /// `None` marks a deletion.
    value: Option<String>,
    options: CookieOptions,
}

impl OutgoingCookie {
    fn to_header_value(&self, name: &str) -> String {
        let value = self.value.as_deref().unwrap_or("");
        let mut cookie = format!("{}={}", name, utf8_percent_encode(value, COOKIE_VALUE));

        if let Some(path) = &self.options.path {
            cookie.push_str(&format!("; Path={}", path));
        }
        if let Some(domain) = &self.options.domain {
            cookie.push_str(&format!("; Domain={}", domain));
        }
        if self.value.is_none() {
            cookie.push_str(&format!("; Expires={}", EXPIRED));
        } else if let Some(max_age) = &self.options.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        if self.options.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.options.secure {
            cookie.push_str("; Secure");
        }
        if let Some(same_site) = &self.options.same_site {
            cookie.push_str(&format!("; SameSite={}", same_site));
        }

        cookie
    }
}

#[derive(Debug, Default)]
struct JarState {
    incoming: BTreeMap<String, String>,
    outgoing: BTreeMap<String, OutgoingCookie>,
}

/// Cookie jar bound to one request. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    state: Arc<Mutex<JarState>>,
}

impl CookieJar {
    /// Create a jar seeded from the request's `Cookie` headers.
    pub fn new(request: &RouteRequest) -> Self {
        let mut incoming = BTreeMap::new();

        for header in request.headers().get_all(COOKIE) {
            let Ok(header) = header.to_str() else {
                continue;
            };
            for pair in header.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let value = percent_decode_str(value.trim()).decode_utf8_lossy();
                    incoming.insert(name.trim().to_string(), value.into_owned());
                }
            }
        }

        Self {
            state: Arc::new(Mutex::new(JarState {
                incoming,
                outgoing: BTreeMap::new(),
            })),
        }
    }

    /// Current value of a cookie; outgoing changes win over the request.
    pub fn get(&self, name: &str) -> Option<String> {
        let state = self.state.lock();
        match state.outgoing.get(name) {
            Some(cookie) => cookie.value.clone(),
            None => state.incoming.get(name).cloned(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Record a cookie to send with the response.
    ///
    /// The value is percent-encoded on the wire; the name must be a token.
    pub fn set(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        options: CookieOptions,
    ) -> Result<(), RenderError> {
        let name = checked_name(name.into())?;
        self.state.lock().outgoing.insert(
            name,
            OutgoingCookie {
                value: Some(value.into()),
                options,
            },
        );
        Ok(())
    }

    /// Record a deletion; the response expires the cookie.
    pub fn delete(
        &self,
        name: impl Into<String>,
        options: CookieOptions,
    ) -> Result<(), RenderError> {
        let name = checked_name(name.into())?;
        self.state.lock().outgoing.insert(
            name,
            OutgoingCookie {
                value: None,
                options,
            },
        );
        Ok(())
    }

    /// Serialized `Set-Cookie` values for every outgoing cookie.
    pub fn headers(&self) -> Vec<String> {
        self.state
            .lock()
            .outgoing
            .iter()
            .map(|(name, cookie)| cookie.to_header_value(name))
            .collect()
    }

    /// Whether two handles point at the same jar.
    pub fn same_jar(&self, other: &CookieJar) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// Marker stored in response extensions once cookies were attached.
#[derive(Debug, Clone, Copy)]
struct CookiesAttached;

/// Write the jar's cookies to the response as `Set-Cookie` headers.
///
/// A response that already received cookies is left untouched. On error
/// the response is not modified.
pub fn attach_cookies_to_response(
    response: &mut Response,
    cookies: &CookieJar,
) -> Result<(), RenderError> {
    if cookies_attached(response) {
        return Ok(());
    }

    let values = cookies
        .headers()
        .iter()
        .map(|value| HeaderValue::from_str(value))
        .collect::<Result<Vec<_>, _>>()?;

    let headers = response.headers_mut();
    for value in values {
        headers.append(SET_COOKIE, value);
    }
    response.extensions_mut().insert(CookiesAttached);
    Ok(())
}

/// Whether [`attach_cookies_to_response`] already ran on this response.
pub fn cookies_attached(response: &Response) -> bool {
    response.extensions().get::<CookiesAttached>().is_some()
}
