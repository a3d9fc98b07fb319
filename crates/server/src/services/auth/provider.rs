//! Identity provider abstraction.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::AuthError;

/// What a provider tells us about the person who signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub name: String,
    /// Raw address as reported; not yet checked against the allow-list.
    pub email: String,
    pub avatar_url: Option<String>,
}

/// An OAuth 2.0 authorization-code identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Path segment under `/auth/{provider}`.
    fn name(&self) -> &str;

    /// Where to send the browser to start sign-in.
    fn authorization_url(&self, state: &str) -> String;

    /// Trade an authorization code for the signed-in identity.
    async fn exchange(&self, code: &str) -> Result<ProviderIdentity, AuthError>;
}

/// Providers reachable through `/auth/{provider}/...`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn IdentityProvider>) {
        self.providers.insert(provider.name().to_owned(), provider);
    }

    /// Look up a provider by path segment.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownProvider` if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn IdentityProvider>, AuthError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::UnknownProvider(name.to_owned()))
    }

    /// Registered provider names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
