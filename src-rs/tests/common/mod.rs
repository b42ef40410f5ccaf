#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hk_weather_rs::tools::{register_weather_tools, ToolRegistry, WorkerPool};
use hk_weather_rs::weather::{ActResult, BrowserEngine, BrowserError, BrowserSession, WeatherFetcher};

/// Answers every instruction with a fixed text, or fails the extraction.
pub struct FakeEngine {
    pub answer: Option<String>,
    pub pages: Mutex<Vec<String>>,
    pub closed: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(text.to_string()),
            pages: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            pages: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn closed_sessions(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeSession {
    answer: Option<String>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn open(&self, starting_page: &str, _headless: bool) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.pages.lock().unwrap().push(starting_page.to_string());
        Ok(Box::new(FakeSession {
            answer: self.answer.clone(),
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn act(&mut self, _instruction: &str) -> Result<ActResult, BrowserError> {
        match &self.answer {
            Some(text) => Ok(ActResult { response: text.clone() }),
            None => Err(BrowserError::Extraction("simulated browser timeout".to_string())),
        }
    }

    async fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError> {
        std::fs::write(path, b"\x89PNG").map_err(|err| BrowserError::Screenshot(err.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Registry holding the three weather tools. Needs a tokio runtime.
pub fn weather_registry(engine: Arc<FakeEngine>, screenshot_dir: &Path) -> ToolRegistry {
    let fetcher = Arc::new(WeatherFetcher::new(engine, screenshot_dir.to_path_buf()));
    let registry = ToolRegistry::new();
    register_weather_tools(&registry, fetcher, WorkerPool::new(2)).unwrap();
    registry
}
