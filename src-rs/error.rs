use thiserror::Error;

use crate::mcp::TransportError;

/// Faults that stop a binary before any session begins.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{var} environment variable not set")]
    MissingCredential { var: String },
    #[error("failed to initialise language model client: {0}")]
    ProviderInit(String),
    #[error("failed to build async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to connect to tool server: {0}")]
    Connect(#[from] TransportError),
}

impl StartupError {
    /// Follow-up hint printed under the error line.
    pub fn hint(&self) -> Option<String> {
        match self {
            StartupError::MissingCredential { var } => {
                Some(format!("Please set it with: export {}=your_api_key", var))
            }
            _ => None,
        }
    }
}
