pub mod client;
pub mod protocol;
pub mod server;

pub use client::{JsonRpc, McpClient, ToolTransport, TransportError};
pub use protocol::{RpcError, RpcRequest, RpcResponse, ServerInfo, PROTOCOL_VERSION};
pub use server::{serve, ServerContext};
