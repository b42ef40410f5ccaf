use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Value};
use tracing::warn;

use super::pool::WorkerPool;
use super::registry::ToolRegistry;
use super::types::{ToolHandler, ToolSpec};
use crate::result::ToolResult;
use crate::weather::{FetchOptions, WeatherCategory, WeatherFetcher};

pub fn weather_tool_spec(category: WeatherCategory) -> ToolSpec {
    let mut properties = json!({
        "headless": {
            "type": "boolean",
            "description": "Run the browser without a visible window",
            "default": false
        },
        "take_screenshot": {
            "type": "boolean",
            "description": "Save a screenshot of the page",
            "default": true
        }
    });
    if category == WeatherCategory::Forecast {
        properties["days"] = json!({
            "type": "integer",
            "description": "Number of days to forecast",
            "default": 9
        });
    }

    ToolSpec {
        name: category.tool_name().to_string(),
        description: category.description().to_string(),
        input_schema: json!({
            "type": "object",
            "properties": properties,
        }),
    }
}

fn weather_handler(category: WeatherCategory, fetcher: Arc<WeatherFetcher>, pool: WorkerPool) -> ToolHandler {
    Arc::new(move |args: Value| {
        let fetcher = fetcher.clone();
        let pool = pool.clone();
        async move {
            let mut options = match FetchOptions::from_args(args) {
                Ok(options) => options,
                Err(err) => return ToolResult::failure(err),
            };
            // Only the forecast schema declares `days`.
            if category != WeatherCategory::Forecast {
                options.days = FetchOptions::default().days;
            }
            match pool.run(async move { fetcher.fetch(category, &options).await }).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(%category, error = %err, "fetch job did not complete");
                    ToolResult::failure(err.to_string())
                }
            }
        }
        .boxed()
    })
}

/// Registers the current, forecast and warnings tools in that order.
pub fn register_weather_tools(registry: &ToolRegistry, fetcher: Arc<WeatherFetcher>, pool: WorkerPool) -> Result<(), String> {
    for category in WeatherCategory::ALL {
        registry.register(
            category.tool_name(),
            weather_handler(category, fetcher.clone(), pool.clone()),
            weather_tool_spec(category),
        )?;
    }
    Ok(())
}
