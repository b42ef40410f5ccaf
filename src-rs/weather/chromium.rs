use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::browser::{ActResult, BrowserEngine, BrowserError, BrowserSession};
use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LLMRouter, Message};

const EXTRACTION_PROMPT: &str = "You read the visible text of a web page and carry out the instruction you are given. \
Answer only from the page text. Keep values exactly as shown on the page, including units. \
If the page does not contain the requested information, say so plainly.";

const PAGE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

/// Answers a natural-language instruction from a page's visible text using
/// the configured language model.
pub struct PageExtractor {
    router: Arc<LLMRouter>,
    llm: LlmConfig,
    page_text_limit: usize,
}

impl PageExtractor {
    pub fn new(router: Arc<LLMRouter>, llm: LlmConfig, page_text_limit: usize) -> Self {
        Self {
            router,
            llm,
            page_text_limit,
        }
    }

    pub async fn extract(&self, instruction: &str, page_text: &str) -> Result<String, BrowserError> {
        let request = self.request(instruction, page_text);
        let router = self.router.clone();
        // the provider client is blocking
        let response = tokio::task::spawn_blocking(move || router.complete(request))
            .await
            .map_err(|err| BrowserError::Extraction(err.to_string()))?
            .map_err(|err| BrowserError::Extraction(err.to_string()))?;
        let text = response.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(BrowserError::Extraction("model returned no text".to_string()));
        }
        Ok(text.to_string())
    }

    fn request(&self, instruction: &str, page_text: &str) -> CompletionRequest {
        let body = truncate_chars(page_text, self.page_text_limit);
        let prompt = format!("Instruction: {}\n\nPage text:\n{}", instruction, body);
        CompletionRequest {
            messages: vec![Message::user_text(&prompt)],
            system: Some(EXTRACTION_PROMPT.to_string()),
            tools: None,
            temperature: Some(self.llm.temperature),
            max_tokens: Some(self.llm.max_tokens),
            model: Some(self.llm.resolved_model()),
            provider: Some(self.llm.provider.clone()),
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Chromium over CDP. One browser process per session.
pub struct ChromiumEngine {
    extractor: Arc<PageExtractor>,
}

impl ChromiumEngine {
    pub fn new(extractor: Arc<PageExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn open(&self, starting_page: &str, headless: bool) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let mut builder = BrowserConfig::builder().window_size(1400, 1000);
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match open_page(&browser, starting_page).await {
            Ok(page) => page,
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "failed to close browser after navigation error");
                }
                events.abort();
                return Err(err);
            }
        };
        debug!(url = starting_page, headless, "browser session opened");

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            events,
            extractor: self.extractor.clone(),
        }))
    }
}

async fn open_page(browser: &Browser, url: &str) -> Result<Page, BrowserError> {
    let page = browser
        .new_page(url)
        .await
        .map_err(|err| BrowserError::Navigation(err.to_string()))?;
    page.wait_for_navigation()
        .await
        .map_err(|err| BrowserError::Navigation(err.to_string()))?;
    Ok(page)
}

struct ChromiumSession {
    browser: Browser,
    page: Page,
    events: JoinHandle<()>,
    extractor: Arc<PageExtractor>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn act(&mut self, instruction: &str) -> Result<ActResult, BrowserError> {
        let text: String = self
            .page
            .evaluate(PAGE_TEXT_SCRIPT)
            .await
            .map_err(|err| BrowserError::Extraction(err.to_string()))?
            .into_value()
            .map_err(|err| BrowserError::Extraction(err.to_string()))?;
        debug!(chars = text.chars().count(), "read page text");
        let response = self.extractor.extract(instruction, &text).await?;
        Ok(ActResult { response })
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await
            .map(|_| ())
            .map_err(|err| BrowserError::Screenshot(err.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        let mut session = *self;
        let closed = session
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|err| BrowserError::Close(err.to_string()));
        if closed.is_ok() {
            if let Err(err) = session.browser.wait().await {
                warn!(error = %err, "browser process did not exit cleanly");
            }
        }
        session.events.abort();
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("28°C sunny", 3), "28°");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn extraction_request_carries_instruction_and_limit() {
        let extractor = PageExtractor::new(Arc::new(LLMRouter::new("anthropic")), LlmConfig::default(), 5);
        let request = extractor.request("Read the temperature", "Temperature 28 degrees");
        let text = match &request.messages[0].content[0] {
            crate::llm::ContentBlock::Text { text } => text.clone(),
            other => panic!("unexpected block {:?}", other),
        };
        assert!(text.starts_with("Instruction: Read the temperature"));
        assert!(text.ends_with("Tempe"));
        assert_eq!(request.provider.as_deref(), Some("anthropic"));
        assert!(request.tools.is_none());
    }
}
