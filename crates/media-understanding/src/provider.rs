//! Media understanding provider abstraction and registry.

use std::{collections::BTreeMap, sync::Arc};

use {async_trait::async_trait, bytes::Bytes};

use crate::{capability::MediaCapability, error::Result};

/// One attachment handed to a provider.
#[derive(Debug, Clone)]
pub struct MediaRequest {
    pub capability: MediaCapability,
    pub attachment_index: usize,
    /// Raw attachment bytes.
    pub data: Bytes,
    pub mime: Option<String>,
    pub file_name: Option<String>,
    /// Model requested by config; `None` lets the provider pick.
    pub model: Option<String>,
    pub prompt: String,
    /// Language hint (ISO 639-1 code, e.g. "en").
    pub language: Option<String>,
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaResponse {
    pub text: String,
    /// Model that actually served the request.
    pub model: Option<String>,
}

/// Turns images, audio or video into text.
#[async_trait]
pub trait MediaUnderstandingProvider: Send + Sync {
    /// Provider identifier used in `tools.media.<capability>.models[].provider`.
    fn id(&self) -> &str;

    /// Capabilities this provider can serve.
    fn capabilities(&self) -> &[MediaCapability];

    fn supports(&self, capability: MediaCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    async fn understand(&self, request: MediaRequest) -> Result<MediaResponse>;
}

/// Registered providers, keyed by id.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn MediaUnderstandingProvider>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous one with the same id.
    pub fn register(&mut self, provider: Arc<dyn MediaUnderstandingProvider>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn MediaUnderstandingProvider>> {
        self.providers.get(id).cloned()
    }

    #[must_use]
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Providers that serve `capability`, in id order.
    #[must_use]
    pub fn supporting(&self, capability: MediaCapability) -> Vec<Arc<dyn MediaUnderstandingProvider>> {
        self.providers
            .values()
            .filter(|p| p.supports(capability))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}

/// Registry with no built-in providers. Callers register their own.
#[must_use]
pub fn build_provider_registry() -> ProviderRegistry {
    ProviderRegistry::new()
}

/// Registry pre-populated with `providers`.
#[must_use]
pub fn build_provider_registry_with(
    providers: impl IntoIterator<Item = Arc<dyn MediaUnderstandingProvider>>,
) -> ProviderRegistry {
    let mut registry = build_provider_registry();
    for provider in providers {
        registry.register(provider);
    }
    registry
}
