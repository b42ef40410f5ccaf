use clap::Parser;

use hk_weather_rs::{AssistantConfig, DispatchMode};

use crate::models::CliConfig;

/// Interactive Hong Kong weather assistant.
#[derive(Debug, Parser)]
#[command(name = "hk-weather-assistant", version)]
pub struct Args {
    /// Path to the hk-weather-server executable.
    pub server_path: String,
    /// How queries are mapped to tools.
    #[arg(long, value_enum)]
    pub mode: Option<DispatchMode>,
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub temperature: Option<f64>,
    /// Run the browser without a window on keyword calls.
    #[arg(long)]
    pub headless: bool,
    /// Skip screenshots on keyword calls.
    #[arg(long)]
    pub no_screenshot: bool,
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Flags win over `HK_WEATHER_*` variables.
    pub fn into_config(self, mut assistant: AssistantConfig) -> CliConfig {
        if let Some(mode) = self.mode {
            assistant.mode = mode;
        }
        if let Some(provider) = self.provider {
            assistant.llm.provider = provider;
        }
        if self.model.is_some() {
            assistant.llm.model = self.model;
        }
        if let Some(temperature) = self.temperature {
            assistant.llm.temperature = temperature;
        }
        if self.headless {
            assistant.headless = true;
        }
        if self.no_screenshot {
            assistant.take_screenshot = false;
        }
        CliConfig {
            server_path: self.server_path,
            log_level: self.log_level,
            assistant,
        }
    }
}

pub fn parse_config() -> CliConfig {
    Args::parse().into_config(AssistantConfig::from_env())
}
