//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::SatchelConfig;
use crate::db::Directory;
use crate::services::auth::{AllowedDomains, ProviderRegistry};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// employee directory, the identity providers and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SatchelConfig,
    directory: Directory,
    providers: ProviderRegistry,
    allowed_domains: AllowedDomains,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Satchel configuration
    /// * `directory` - Employee directory with its backend installed
    /// * `providers` - Identity providers reachable under `/auth/{provider}`
    #[must_use]
    pub fn new(config: SatchelConfig, directory: Directory, providers: ProviderRegistry) -> Self {
        let allowed_domains = AllowedDomains::new(config.auth.allowed_domains.iter().cloned());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                directory,
                providers,
                allowed_domains,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &SatchelConfig {
        &self.inner.config
    }

    /// Get a reference to the employee directory.
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.inner.directory
    }

    /// Get a reference to the identity provider registry.
    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.inner.providers
    }

    /// Get a reference to the sign-in domain allow-list.
    #[must_use]
    pub fn allowed_domains(&self) -> &AllowedDomains {
        &self.inner.allowed_domains
    }
}
