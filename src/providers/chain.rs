//! Ordered fallback across providers.

use super::{Capability, OpenAiCompatible, Provider, ProviderDescriptor, ProviderRequest};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A fixed-priority list of providers.
///
/// Each call walks the list in order, skipping providers that lack the
/// requested capability, and returns the first success. Every provider gets
/// exactly one attempt per call; the fallback is the retry strategy.
#[derive(Debug, Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    /// Build the chain from descriptors whose credentials hold right now.
    ///
    /// Credentials are checked once here and never again for the lifetime of
    /// the chain. Fails only when the HTTP client cannot be built.
    #[instrument(level = "info", skip_all, fields(candidates = descriptors.len()))]
    pub async fn discover(
        descriptors: &[ProviderDescriptor],
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("cannot build HTTP client: {e}")))?;

        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
        for descriptor in descriptors {
            let Some(api_key) = descriptor.credential.resolve(&client, PROBE_TIMEOUT).await else {
                info!(provider = %descriptor.name, "Provider not configured; skipping");
                continue;
            };
            match OpenAiCompatible::new(descriptor, api_key, client.clone(), request_timeout) {
                Ok(provider) => {
                    info!(
                        provider = %descriptor.name,
                        capabilities = ?descriptor.capabilities(),
                        "Provider eligible"
                    );
                    providers.push(Arc::new(provider));
                }
                Err(e) => warn!(provider = %descriptor.name, error = %e, "Provider misconfigured; skipping"),
            }
        }

        if providers.is_empty() {
            warn!("No AI provider available; every article will use fallback output");
        }
        Ok(Self { providers })
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl Provider for ProviderChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn supports(&self, capability: Capability) -> bool {
        self.providers.iter().any(|p| p.supports(capability))
    }

    async fn generate(&self, request: &ProviderRequest<'_>) -> Result<String, ProviderError> {
        let mut last: Option<ProviderError> = None;

        for provider in self.providers.iter().filter(|p| p.supports(request.capability)) {
            match provider.generate(request).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        capability = %request.capability,
                        error = %e,
                        "Provider failed; falling through"
                    );
                    last = Some(e);
                }
            }
        }

        match last {
            Some(last) => Err(ProviderError::AllProvidersExhausted {
                capability: request.capability,
                last: Box::new(last),
            }),
            None => Err(ProviderError::NoEligibleProvider(request.capability)),
        }
    }
}
