use std::env;
use std::sync::Arc;

use tracing::info;

use crate::config::LlmConfig;
use crate::error::StartupError;
use crate::llm::{AnthropicAdapter, AnthropicConfig, GeminiAdapter, GeminiConfig, LLMRouter};

pub const SUPPORTED_PROVIDERS: [&str; 2] = ["anthropic", "gemini"];

fn load_keys_from_env(primary: &str, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Ok(raw) = env::var(primary) {
        for item in raw.split(',') {
            let trimmed = item.trim();
            if !trimmed.is_empty() {
                keys.push(trimmed.to_string());
            }
        }
    }
    for idx in 2..=10 {
        let key = format!("{}_{}", prefix, idx);
        if let Ok(value) = env::var(&key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                keys.push(trimmed.to_string());
            }
        }
    }
    keys
}

/// Environment variable holding the credential for `provider`.
pub fn credential_var(provider: &str) -> &'static str {
    match provider {
        "gemini" => "GEMINI_API_KEY",
        _ => "ANTHROPIC_API_KEY",
    }
}

pub fn load_provider_keys(provider: &str) -> Vec<String> {
    let var = credential_var(provider);
    load_keys_from_env(var, var)
}

/// Fails fast when the selected provider has no credential. Runs before any
/// network or process activity.
pub fn require_credentials(cfg: &LlmConfig) -> Result<(), StartupError> {
    if !SUPPORTED_PROVIDERS.contains(&cfg.provider.as_str()) {
        return Err(StartupError::ProviderInit(format!(
            "unsupported provider: {} (expected one of {})",
            cfg.provider,
            SUPPORTED_PROVIDERS.join(", ")
        )));
    }
    if load_provider_keys(&cfg.provider).is_empty() {
        return Err(StartupError::MissingCredential {
            var: credential_var(&cfg.provider).to_string(),
        });
    }
    Ok(())
}

/// Registers every provider that has keys; the selected one must be among them.
pub fn build_llm_router(cfg: &LlmConfig) -> Result<LLMRouter, StartupError> {
    require_credentials(cfg)?;
    let mut router = LLMRouter::new(&cfg.provider);

    let anthropic_keys = load_provider_keys("anthropic");
    if !anthropic_keys.is_empty() {
        let model = if cfg.provider == "anthropic" {
            cfg.resolved_model()
        } else {
            String::new()
        };
        let adapter = AnthropicAdapter::new(AnthropicConfig {
            api_keys: anthropic_keys,
            base_url: env::var("ANTHROPIC_BASE_URL").unwrap_or_default(),
            model,
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
        .map_err(|err| StartupError::ProviderInit(err.to_string()))?;
        router.register_provider("anthropic", Arc::new(adapter));
    }

    let gemini_keys = load_provider_keys("gemini");
    if !gemini_keys.is_empty() {
        let model = if cfg.provider == "gemini" {
            cfg.resolved_model()
        } else {
            String::new()
        };
        let adapter = GeminiAdapter::new(GeminiConfig {
            api_keys: gemini_keys,
            base_url: env::var("GEMINI_BASE_URL").unwrap_or_default(),
            model,
            temperature: cfg.temperature,
        })
        .map_err(|err| StartupError::ProviderInit(err.to_string()))?;
        router.register_provider("gemini", Arc::new(adapter));
    }

    info!(provider = %cfg.provider, model = %cfg.resolved_model(), "language model client initialised");
    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_var_per_provider() {
        assert_eq!(credential_var("anthropic"), "ANTHROPIC_API_KEY");
        assert_eq!(credential_var("gemini"), "GEMINI_API_KEY");
    }

    #[test]
    fn unknown_provider_is_rejected_before_key_lookup() {
        let cfg = LlmConfig {
            provider: "bedrock".to_string(),
            ..LlmConfig::default()
        };
        let err = require_credentials(&cfg).unwrap_err();
        assert!(matches!(err, StartupError::ProviderInit(_)));
    }

    #[test]
    fn suffixed_keys_are_collected() {
        env::set_var("HKW_TEST_KEY", "a, b");
        env::set_var("HKW_TEST_KEY_3", "c");
        let keys = load_keys_from_env("HKW_TEST_KEY", "HKW_TEST_KEY");
        assert_eq!(keys, vec!["a", "b", "c"]);
        env::remove_var("HKW_TEST_KEY");
        env::remove_var("HKW_TEST_KEY_3");
    }
}
