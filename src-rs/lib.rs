pub mod config;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod result;

#[path = "llm/lib.rs"]
pub mod llm;
#[path = "tools/lib.rs"]
pub mod tools;
#[path = "weather/lib.rs"]
pub mod weather;
#[path = "mcp/lib.rs"]
pub mod mcp;
#[path = "assistant/lib.rs"]
pub mod assistant;

pub use assistant::{DispatchMode, WeatherAssistant};
pub use config::{AssistantConfig, LlmConfig, ServerConfig};
pub use result::ToolResult;
pub use weather::WeatherCategory;
