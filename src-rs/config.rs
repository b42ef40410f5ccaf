use std::env;
use std::path::PathBuf;

use crate::assistant::DispatchMode;

pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful weather assistant for Hong Kong. You can provide current weather information, \
forecasts, and weather warnings by using the available tools. When responding:

1. Be concise and informative
2. Focus on the weather information requested
3. Interpret the data from the tools to provide insights
4. Suggest appropriate actions based on weather conditions when relevant
5. If you don't have enough information, use the appropriate tool to get it

Available tools:
- get_hk_current_weather: Get current weather conditions in Hong Kong
- get_hk_forecast: Get the 9-day weather forecast for Hong Kong
- get_hk_weather_warnings: Get any active weather warnings for Hong Kong";

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: String,
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            model: None,
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider: env_or("HK_WEATHER_PROVIDER", defaults.provider),
            model: env_opt("HK_WEATHER_MODEL"),
            temperature: env_float("HK_WEATHER_TEMPERATURE", defaults.temperature),
            max_tokens: env_u32("HK_WEATHER_MAX_TOKENS", defaults.max_tokens),
        }
    }

    /// Model name to send, falling back to the provider's default.
    pub fn resolved_model(&self) -> String {
        if let Some(model) = &self.model {
            return model.clone();
        }
        match self.provider.as_str() {
            "gemini" => DEFAULT_GEMINI_MODEL.to_string(),
            _ => DEFAULT_ANTHROPIC_MODEL.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub mode: DispatchMode,
    pub headless: bool,
    pub take_screenshot: bool,
    pub system_prompt: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            mode: DispatchMode::Model,
            headless: false,
            take_screenshot: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mode = env_opt("HK_WEATHER_MODE")
            .and_then(|raw| raw.parse::<DispatchMode>().ok())
            .unwrap_or(defaults.mode);
        Self {
            llm: LlmConfig::from_env(),
            mode,
            headless: env_bool("HK_WEATHER_HEADLESS", defaults.headless),
            take_screenshot: env_bool("HK_WEATHER_SCREENSHOT", defaults.take_screenshot),
            system_prompt: env_opt("HK_WEATHER_SYSTEM_PROMPT").unwrap_or(defaults.system_prompt),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub llm: LlmConfig,
    pub workers: usize,
    pub screenshot_dir: PathBuf,
    pub page_text_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                temperature: 0.2,
                ..LlmConfig::default()
            },
            workers: 4,
            screenshot_dir: env::temp_dir(),
            page_text_limit: 20_000,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut llm = LlmConfig::from_env();
        llm.temperature = env_float("HK_WEATHER_EXTRACT_TEMPERATURE", defaults.llm.temperature);
        Self {
            llm,
            workers: env_usize("HK_WEATHER_WORKERS", defaults.workers).max(1),
            screenshot_dir: env_opt("HK_WEATHER_SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.screenshot_dir),
            page_text_limit: env_usize("HK_WEATHER_PAGE_TEXT_LIMIT", defaults.page_text_limit),
        }
    }
}

fn env_or(key: &str, fallback: String) -> String {
    env::var(key).unwrap_or(fallback)
}

fn env_opt(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn env_bool(key: &str, fallback: bool) -> bool {
    match env::var(key) {
        Ok(value) => value.parse::<bool>().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_float(key: &str, fallback: f64) -> f64 {
    match env::var(key) {
        Ok(value) => value.parse::<f64>().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_usize(key: &str, fallback: usize) -> usize {
    match env::var(key) {
        Ok(value) => value.parse::<usize>().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_u32(key: &str, fallback: u32) -> u32 {
    match env::var(key) {
        Ok(value) => value.parse::<u32>().unwrap_or(fallback),
        Err(_) => fallback,
    }
}
