use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("extraction failed: {0}")]
    Extraction(String),
    #[error("screenshot failed: {0}")]
    Screenshot(String),
    #[error("failed to close browser: {0}")]
    Close(String),
}

#[derive(Clone, Debug)]
pub struct ActResult {
    pub response: String,
}

/// Starts browser sessions on a given page.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn open(&self, starting_page: &str, headless: bool) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One live browser. `close` must be called on every path.
#[async_trait]
pub trait BrowserSession: Send {
    /// Carries out a natural-language instruction against the current page.
    async fn act(&mut self, instruction: &str) -> Result<ActResult, BrowserError>;

    async fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}
