use hk_weather_rs::AssistantConfig;

#[derive(Clone, Debug)]
pub struct CliConfig {
    pub server_path: String,
    pub log_level: String,
    pub assistant: AssistantConfig,
}

/// Where an interactive session is in its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    AwaitingInput,
    Processing,
    Closed,
}
