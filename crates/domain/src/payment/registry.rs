use std::collections::BTreeMap;
use std::sync::Arc;

use super::{PaymentError, PaymentProvider, WebhookHeaders};

/// Header a webhook sender uses to name its provider.
pub const PROVIDER_HEADER: &str = "x-payment-provider";

/// Payment providers keyed by lowercase name. Immutable once built.
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn PaymentProvider>>,
    default_provider: String,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("default_provider", &self.default_provider)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PaymentProvider>> {
        self.providers.get(&name.trim().to_ascii_lowercase()).cloned()
    }

    pub fn default_provider(&self) -> Arc<dyn PaymentProvider> {
        // Builder guarantees the default is registered.
        self.providers[&self.default_provider].clone()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Picks the provider for an inbound webhook.
    ///
    /// The `X-Payment-Provider` header wins. Next comes the provider whose
    /// own signature header is present. Last, if allowed, the body is
    /// sniffed and the first provider that recognises it is used.
    pub fn resolve(
        &self,
        headers: &WebhookHeaders,
        body: &[u8],
        allow_sniffing: bool,
    ) -> Result<Arc<dyn PaymentProvider>, PaymentError> {
        if let Some(name) = headers.get(PROVIDER_HEADER) {
            return self.get(name).ok_or(PaymentError::UnsupportedProvider);
        }
        if let Some(provider) = self.providers.values().find(|p| {
            p.signature_header()
                .is_some_and(|header| headers.get(header).is_some())
        }) {
            return Ok(provider.clone());
        }
        if !allow_sniffing {
            return Err(PaymentError::UnsupportedProvider);
        }

        let json: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| PaymentError::UnsupportedProvider)?;
        let provider = self
            .providers
            .values()
            .find(|p| p.recognizes(&json))
            .cloned()
            .ok_or(PaymentError::UnsupportedProvider)?;
        tracing::warn!(
            provider = provider.name(),
            "webhook provider inferred from body; send the {PROVIDER_HEADER} header instead"
        );
        Ok(provider)
    }
}

#[derive(Default)]
pub struct ProviderRegistryBuilder {
    providers: BTreeMap<String, Arc<dyn PaymentProvider>>,
    default_provider: Option<String>,
}

impl ProviderRegistryBuilder {
    pub fn register(mut self, provider: Arc<dyn PaymentProvider>) -> Self {
        self.providers
            .insert(provider.name().to_ascii_lowercase(), provider);
        self
    }

    /// Provider used when a caller does not name one. Defaults to the first
    /// registered name in alphabetical order.
    pub fn default_provider(mut self, name: &str) -> Self {
        self.default_provider = Some(name.trim().to_ascii_lowercase());
        self
    }

    pub fn build(self) -> Result<ProviderRegistry, PaymentError> {
        let default_provider = match self.default_provider {
            Some(name) if self.providers.contains_key(&name) => name,
            Some(name) => {
                return Err(PaymentError::Registry(format!(
                    "default provider '{name}' is not registered"
                )));
            }
            None => self
                .providers
                .keys()
                .next()
                .cloned()
                .ok_or_else(|| PaymentError::Registry("no payment providers registered".into()))?,
        };
        Ok(ProviderRegistry {
            providers: self.providers,
            default_provider,
        })
    }
}
