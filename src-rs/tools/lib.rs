pub mod pool;
pub mod registry;
pub mod types;
pub mod weather;

pub use pool::{PoolError, WorkerPool};
pub use registry::ToolRegistry;
pub use types::{ToolEntry, ToolFuture, ToolHandler, ToolSpec};
pub use weather::{register_weather_tools, weather_tool_spec};
