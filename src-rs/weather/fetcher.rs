use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::browser::{BrowserEngine, BrowserError, BrowserSession};
use super::category::WeatherCategory;
use crate::result::ToolResult;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub headless: bool,
    pub take_screenshot: bool,
    pub days: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            take_screenshot: true,
            days: 9,
        }
    }
}

impl FetchOptions {
    /// Parses tool-call arguments; a missing or null object means all defaults.
    /// Keys other than the three options are ignored.
    pub fn from_args(args: Value) -> Result<Self, String> {
        if args.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(args).map_err(|err| format!("invalid arguments: {}", err))
    }
}

#[derive(Clone, Debug)]
pub struct WeatherReport {
    pub category: WeatherCategory,
    pub data: String,
    pub screenshot_path: Option<PathBuf>,
    pub days: u32,
    pub retrieved_at: DateTime<Utc>,
}

impl WeatherReport {
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "success": true,
            "message": self.category.success_message(self.days),
            "screenshot_path": self.screenshot_path.as_ref().map(|p| p.display().to_string()),
            "retrieved_at": self.retrieved_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        });
        payload[self.category.data_field()] = Value::String(self.data.clone());
        payload
    }
}

/// Runs one browser session per call. Never returns an error: every fault is
/// folded into `ToolResult::Failure`.
pub struct WeatherFetcher {
    engine: Arc<dyn BrowserEngine>,
    screenshot_dir: PathBuf,
}

impl WeatherFetcher {
    pub fn new(engine: Arc<dyn BrowserEngine>, screenshot_dir: PathBuf) -> Self {
        Self {
            engine,
            screenshot_dir,
        }
    }

    pub async fn fetch(&self, category: WeatherCategory, options: &FetchOptions) -> ToolResult {
        info!(
            %category,
            headless = options.headless,
            take_screenshot = options.take_screenshot,
            "starting browser session"
        );
        match self.run_session(category, options).await {
            Ok(report) => ToolResult::success(report.to_payload()),
            Err(err) => {
                error!(%category, error = %err, "weather fetch failed");
                ToolResult::failure(err.to_string())
                    .with_message(format!("Error retrieving {}: {}", category.subject(), err))
            }
        }
    }

    async fn run_session(&self, category: WeatherCategory, options: &FetchOptions) -> Result<WeatherReport, BrowserError> {
        let mut session = self
            .engine
            .open(category.starting_page(), options.headless)
            .await?;
        let outcome = self.extract(session.as_mut(), category, options).await;
        if let Err(err) = session.close().await {
            warn!(%category, error = %err, "browser session did not close cleanly");
        }
        outcome
    }

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        category: WeatherCategory,
        options: &FetchOptions,
    ) -> Result<WeatherReport, BrowserError> {
        let result = session.act(category.instruction()).await?;
        info!(%category, response = %result.response, "act command completed");

        let screenshot_path = if options.take_screenshot {
            self.capture(session, category).await
        } else {
            None
        };

        Ok(WeatherReport {
            category,
            data: result.response,
            screenshot_path,
            days: options.days,
            retrieved_at: Utc::now(),
        })
    }

    async fn capture(&self, session: &mut dyn BrowserSession, category: WeatherCategory) -> Option<PathBuf> {
        let path = self
            .screenshot_dir
            .join(screenshot_file_name(category.screenshot_prefix()));
        match session.screenshot(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "screenshot taken");
                Some(path)
            }
            Err(err) => {
                error!(error = %err, "error taking screenshot");
                None
            }
        }
    }

    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }
}

/// `<prefix>_<8 hex chars>.png`
pub fn screenshot_file_name(prefix: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}.png", prefix, &id[..8])
}
