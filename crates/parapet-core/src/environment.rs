//! Shared rendering environment and its route cache.
//!
//! The environment is the only state shared between concurrent requests.
//! Everything in it is read-only after construction, except for the
//! route cache which is safe for concurrent access.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::RenderError;

/// Thread-safe cache of route metadata, keyed by route pattern.
#[derive(Debug, Clone, Default)]
pub struct RouteCache {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for a route pattern.
    pub fn get(&self, route: &str) -> Option<Value> {
        self.entries.read().get(route).cloned()
    }

    /// Store metadata for a route pattern, replacing any previous entry.
    pub fn set(&self, route: impl Into<String>, metadata: Value) {
        self.entries.write().insert(route.into(), metadata);
    }

    /// Drop one route's metadata.
    pub fn remove(&self, route: &str) -> Option<Value> {
        self.entries.write().remove(route)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry. Not atomic with respect to concurrent `set`s.
    pub fn clear_all(&self) {
        self.entries.write().clear();
    }
}

/// Deserializable environment settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Public site URL, e.g. `https://example.com`.
    pub site: Option<String>,
    /// Base path the site is served under.
    pub base: String,
    /// Whether routes are rendered on demand by a server.
    pub ssr: bool,
    /// Name of the hosting adapter.
    pub adapter_name: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            site: None,
            base: "/".to_string(),
            ssr: false,
            adapter_name: None,
        }
    }
}

/// Errors raised while loading an [`EnvironmentConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse environment config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("`site` must be an absolute URL, got '{site}': {reason}")]
    InvalidSite { site: String, reason: String },

    #[error("`base` must not be empty")]
    EmptyBase,
}

impl EnvironmentConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: EnvironmentConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(site) = &self.site {
            Url::parse(site).map_err(|e| ConfigError::InvalidSite {
                site: site.clone(),
                reason: e.to_string(),
            })?;
        }
        if self.base.is_empty() {
            return Err(ConfigError::EmptyBase);
        }
        Ok(())
    }
}

/// Settings and shared state visible to every render.
#[derive(Debug, Clone)]
pub struct Environment {
    site: Option<String>,
    base: String,
    ssr: bool,
    adapter_name: Option<String>,
    route_cache: RouteCache,
}

impl Environment {
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }

    /// Environment with no site, base `/`, static rendering and no adapter.
    pub fn basic() -> Self {
        Self {
            site: None,
            base: "/".to_string(),
            ssr: false,
            adapter_name: None,
            route_cache: RouteCache::new(),
        }
    }

    pub fn from_config(config: EnvironmentConfig) -> Result<Self, RenderError> {
        let mut builder = Self::builder().with_base(config.base).with_ssr(config.ssr);
        if let Some(site) = config.site {
            builder = builder.with_site(site);
        }
        if let Some(adapter) = config.adapter_name {
            builder = builder.with_adapter_name(adapter);
        }
        builder.build()
    }

    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn ssr(&self) -> bool {
        self.ssr
    }

    pub fn adapter_name(&self) -> Option<&str> {
        self.adapter_name.as_deref()
    }

    pub fn route_cache(&self) -> &RouteCache {
        &self.route_cache
    }
}

/// Builder for [`Environment`].
#[derive(Debug, Default)]
pub struct EnvironmentBuilder {
    site: Option<String>,
    base: Option<String>,
    ssr: bool,
    adapter_name: Option<String>,
    route_cache: Option<RouteCache>,
}

impl EnvironmentBuilder {
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_ssr(mut self, ssr: bool) -> Self {
        self.ssr = ssr;
        self
    }

    pub fn with_adapter_name(mut self, adapter_name: impl Into<String>) -> Self {
        self.adapter_name = Some(adapter_name.into());
        self
    }

    /// Share an existing cache, e.g. across dev-server restarts.
    pub fn with_route_cache(mut self, cache: RouteCache) -> Self {
        self.route_cache = Some(cache);
        self
    }

    /// Validate the site URL and base, then build the environment.
    pub fn build(self) -> Result<Environment, RenderError> {
        if let Some(site) = &self.site {
            Url::parse(site)?;
        }
        let base = self.base.unwrap_or_else(|| "/".to_string());
        if base.is_empty() {
            return Err(RenderError::EmptyBase);
        }

        Ok(Environment {
            site: self.site,
            base,
            ssr: self.ssr,
            adapter_name: self.adapter_name,
            route_cache: self.route_cache.unwrap_or_default(),
        })
    }
}
