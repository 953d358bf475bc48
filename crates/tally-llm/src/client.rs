use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::SdkError;
use crate::provider::{ProviderAdapter, registered_factories};
use crate::types::{Request, Response};

/// Completion client that routes requests to a named provider adapter.
#[derive(Clone, Default)]
pub struct Client {
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    default_provider: Option<String>,
}

impl Client {
    pub fn new(
        providers: HashMap<String, Arc<dyn ProviderAdapter>>,
        default_provider: Option<String>,
    ) -> Self {
        Self {
            providers,
            default_provider,
        }
    }

    pub fn register_provider(&mut self, provider: Arc<dyn ProviderAdapter>) {
        let name = provider.name().to_string();
        if self.default_provider.is_none() {
            self.default_provider = Some(name.clone());
        }
        self.providers.insert(name, provider);
    }

    pub fn set_default_provider(&mut self, provider: impl Into<String>) {
        self.default_provider = Some(provider.into());
    }

    pub fn default_provider(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    /// Build a client from every registered factory whose environment is
    /// configured. The first configured provider becomes the default.
    pub fn from_env() -> Result<Self, SdkError> {
        let mut providers = HashMap::new();
        let mut default_provider = None;

        for factory in registered_factories() {
            if let Some(adapter) = factory.from_env() {
                let name = adapter.name().to_string();
                if default_provider.is_none() {
                    default_provider = Some(name.clone());
                }
                providers.insert(name, adapter);
            }
        }

        Ok(Self {
            providers,
            default_provider,
        })
    }

    pub async fn complete(&self, mut request: Request) -> Result<Response, SdkError> {
        let provider_name = self.resolve_provider(&request)?;
        request.provider = Some(provider_name.clone());
        let adapter = self
            .providers
            .get(&provider_name)
            .ok_or_else(|| SdkError::configuration("provider not registered"))?
            .clone();

        adapter.complete(request).await
    }

    fn resolve_provider(&self, request: &Request) -> Result<String, SdkError> {
        if let Some(provider) = &request.provider {
            return Ok(provider.clone());
        }
        if let Some(provider) = &self.default_provider {
            return Ok(provider.clone());
        }
        Err(SdkError::configuration("no provider configured"))
    }
}
