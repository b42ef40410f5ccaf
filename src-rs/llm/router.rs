use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::types::{CompletionRequest, LLMResponse, ProviderAdapter, ProviderError};

pub struct LLMRouter {
    default_provider: String,
    providers: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl LLMRouter {
    pub fn new(default_provider: &str) -> Self {
        Self {
            default_provider: default_provider.to_string(),
            providers: HashMap::new(),
        }
    }

    pub fn register_provider(&mut self, name: &str, adapter: Arc<dyn ProviderAdapter>) {
        self.providers.insert(name.to_string(), adapter);
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let provider = request
            .provider
            .clone()
            .unwrap_or_else(|| self.default_provider.clone());
        let adapter = self.providers.get(&provider).ok_or_else(|| {
            ProviderError::new("provider_missing", &format!("provider not registered: {}", provider), false)
        })?;
        debug!(
            provider = %provider,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "sending completion request"
        );
        adapter.complete(request)
    }
}
