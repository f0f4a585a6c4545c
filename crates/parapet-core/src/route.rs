//! Route descriptors and the route URL builder.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RenderError;
use crate::path::join_paths;

/// Site used when neither the environment nor the caller provides one.
pub const DEFAULT_SITE: &str = "http://localhost:4321";

/// Route parameters, keyed by parameter name.
pub type Params = BTreeMap<String, String>;

/// Builds a pathname (relative to the base) from route parameters.
pub type PathGenerator = Arc<dyn Fn(&Params) -> String + Send + Sync>;

/// Kind of route, which decides how its render result is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteType {
    /// Markup page rendered to HTML.
    Page,
    /// Plain handler producing data or a raw response.
    Endpoint,
    /// Configured redirect, no user code runs.
    Redirect,
    /// Fallback page used when no other route matched.
    Fallback,
}

impl RouteType {
    /// Lowercase name, as used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::Page => "page",
            RouteType::Endpoint => "endpoint",
            RouteType::Redirect => "redirect",
            RouteType::Fallback => "fallback",
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a redirect route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Value of the `Location` header.
    pub location: String,
    /// Redirect status code.
    pub status: StatusCode,
}

impl RedirectTarget {
    /// Permanent redirect (301).
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            status: StatusCode::MOVED_PERMANENTLY,
        }
    }

    /// Set the redirect status code.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

/// Describes a route. Owned by the routing layer, read-only here.
#[derive(Clone)]
pub struct RouteData {
    /// Route pattern, e.g. `/blog/[slug]`.
    pub route: String,
    pub route_type: RouteType,
    /// Whether the route is rendered at build time even in SSR mode.
    pub prerender: bool,
    pub generate: Option<PathGenerator>,
    pub redirect: Option<RedirectTarget>,
}

impl fmt::Debug for RouteData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteData")
            .field("route", &self.route)
            .field("route_type", &self.route_type)
            .field("prerender", &self.prerender)
            .field("generate", &self.generate.is_some())
            .field("redirect", &self.redirect)
            .finish()
    }
}

impl RouteData {
    /// Create a route descriptor without a path generator.
    pub fn new(route: impl Into<String>, route_type: RouteType) -> Self {
        Self {
            route: route.into(),
            route_type,
            prerender: false,
            generate: None,
            redirect: None,
        }
    }

    /// Page route whose generator is derived from its pattern.
    pub fn page(route: impl Into<String>) -> Self {
        Self::new(route, RouteType::Page).with_pattern_generator()
    }

    /// Endpoint route whose generator is derived from its pattern.
    pub fn endpoint(route: impl Into<String>) -> Self {
        Self::new(route, RouteType::Endpoint).with_pattern_generator()
    }

    /// Redirect route pointing at `target`.
    pub fn redirect(route: impl Into<String>, target: RedirectTarget) -> Self {
        let mut data = Self::new(route, RouteType::Redirect).with_pattern_generator();
        data.redirect = Some(target);
        data
    }

    /// Set the prerender flag.
    pub fn with_prerender(mut self, prerender: bool) -> Self {
        self.prerender = prerender;
        self
    }

    /// Set a custom path generator.
    pub fn with_generate<F>(mut self, generate: F) -> Self
    where
        F: Fn(&Params) -> String + Send + Sync + 'static,
    {
        self.generate = Some(Arc::new(generate));
        self
    }

    /// Derive the path generator from the route pattern.
    pub fn with_pattern_generator(mut self) -> Self {
        let pattern = self.route.clone();
        self.generate = Some(Arc::new(move |params: &Params| {
            generate_from_pattern(&pattern, params)
        }));
        self
    }
}

/// Fill `[param]` and `[...rest]` segments of a pattern from `params`.
///
/// Missing parameters produce empty segments; a rest parameter that is
/// empty drops its segment entirely.
pub fn generate_from_pattern(pattern: &str, params: &Params) -> String {
    let mut out: Vec<String> = Vec::new();

    for segment in pattern.split('/') {
        if let Some(name) = segment
            .strip_prefix("[...")
            .and_then(|s| s.strip_suffix(']'))
        {
            match params.get(name) {
                Some(value) if !value.is_empty() => out.push(value.clone()),
                _ => {}
            }
        } else if let Some(name) = segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            out.push(params.get(name).cloned().unwrap_or_default());
        } else {
            out.push(segment.to_string());
        }
    }

    let joined = out.join("/");
    if pattern.starts_with('/') && !joined.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Inputs to [`create_route_url`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteUrlOptions<'a> {
    pub params: Option<&'a Params>,
    /// Site origin; defaults to [`DEFAULT_SITE`].
    pub site: Option<&'a str>,
    /// Base path; defaults to `/`.
    pub base: Option<&'a str>,
}

/// Build the fully-qualified URL of a route.
///
/// Routes without a generator resolve to the base. An empty generated
/// path resolves to the site itself so no trailing slash is introduced.
pub fn create_route_url(route: &RouteData, options: &RouteUrlOptions<'_>) -> Result<Url, RenderError> {
    let site = Url::parse(options.site.unwrap_or(DEFAULT_SITE))?;
    let base = options.base.unwrap_or("/");

    let Some(generate) = &route.generate else {
        return Ok(site.join(base)?);
    };

    let empty = Params::new();
    let without_base = generate(options.params.unwrap_or(&empty));
    let pathname = if without_base.is_empty() {
        String::new()
    } else {
        join_paths(&[base, &without_base])
    };

    Ok(site.join(&pathname)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_generator_resolves_base_against_defaults() {
        let route = RouteData::new("/stub", RouteType::Page);
        let url = create_route_url(&route, &RouteUrlOptions::default()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:4321/");
    }

    #[test]
    fn no_generator_uses_given_base() {
        let route = RouteData::new("/stub", RouteType::Page);
        let options = RouteUrlOptions {
            site: Some("https://example.com"),
            base: Some("/docs/"),
            ..Default::default()
        };
        let url = create_route_url(&route, &options).unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs/");
    }

    #[test]
    fn generated_path_is_joined_with_base() {
        let route = RouteData::page("/blog/[slug]");
        let p = params(&[("slug", "hello-world")]);
        let options = RouteUrlOptions {
            params: Some(&p),
            site: Some("https://example.com"),
            base: Some("/docs/"),
        };
        let url = create_route_url(&route, &options).unwrap();
        assert_eq!(url.path(), "/docs/blog/hello-world");
    }

    #[test]
    fn generated_path_with_root_base() {
        let route = RouteData::endpoint("/api/items.json");
        let options = RouteUrlOptions {
            site: Some("https://example.com"),
            ..Default::default()
        };
        let url = create_route_url(&route, &options).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/items.json");
    }

    #[test]
    fn empty_generated_path_keeps_site_without_trailing_slash() {
        let route = RouteData::new("/", RouteType::Page).with_generate(|_| String::new());
        let options = RouteUrlOptions {
            site: Some("https://example.com/docs"),
            base: Some("/docs"),
            ..Default::default()
        };
        let url = create_route_url(&route, &options).unwrap();
        assert_eq!(url.as_str(), "https://example.com/docs");
        assert!(!url.path().ends_with('/'));
    }

    #[test]
    fn invalid_site_is_an_error() {
        let route = RouteData::page("/");
        let options = RouteUrlOptions {
            site: Some("not a url"),
            ..Default::default()
        };
        let err = create_route_url(&route, &options).unwrap_err();
        assert!(matches!(err, RenderError::InvalidUrl(_)));
    }

    #[test]
    fn pattern_generator_fills_params() {
        let p = params(&[("lang", "en"), ("slug", "intro")]);
        assert_eq!(generate_from_pattern("/[lang]/docs/[slug]", &p), "/en/docs/intro");
    }

    #[test]
    fn pattern_generator_rest_params() {
        let p = params(&[("path", "a/b/c")]);
        assert_eq!(generate_from_pattern("/files/[...path]", &p), "/files/a/b/c");
        assert_eq!(generate_from_pattern("/files/[...path]", &Params::new()), "/files");
    }

    #[test]
    fn route_type_display() {
        assert_eq!(RouteType::Endpoint.to_string(), "endpoint");
        assert_eq!(RouteType::Redirect.as_str(), "redirect");
    }
}
