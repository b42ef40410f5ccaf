pub mod conversation;
pub mod dispatch;
pub mod normalize;
pub mod orchestrator;
pub mod render;

pub use conversation::Conversation;
pub use dispatch::{keyword_route, DispatchMode, Route};
pub use normalize::{normalize, Envelope};
pub use orchestrator::{AssistantError, WeatherAssistant};
