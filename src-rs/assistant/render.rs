use serde_json::{json, Value};

use super::dispatch::Route;
use crate::result::ToolResult;
use crate::weather::WeatherCategory;

const FORECAST_KEY: &str = "9-day_weather_forecast";
const NO_SCREENSHOT: &str = "No screenshot available";

/// Text shown to the user for a keyword-dispatched call.
pub fn render_outcome(route: Route, result: &ToolResult) -> String {
    let category = route.category;
    let payload = match result {
        ToolResult::Success { payload } if reports_success(payload) => payload,
        ToolResult::Success { payload } => {
            return format!("{}{}", error_prefix(route), payload_error(payload));
        }
        ToolResult::Failure { error, .. } => return format!("{}{}", error_prefix(route), error),
    };

    let data = match payload.get(category.data_field()) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => category.missing_data().to_string(),
        Some(other) => other.to_string(),
    };
    let data = if category == WeatherCategory::Forecast {
        format_forecast(&data)
    } else {
        data
    };

    let mut out = format!("{}\n\n{}", category.heading(), data);
    if !route.defaulted {
        if let Some(path) = screenshot_path(payload) {
            out.push_str(&format!("\n\nA screenshot has been saved to: {}", path));
        }
    }
    out
}

fn error_prefix(route: Route) -> String {
    if route.defaulted {
        "Error retrieving weather information: ".to_string()
    } else {
        format!("Error retrieving {}: ", route.category.subject())
    }
}

fn reports_success(payload: &Value) -> bool {
    payload.get("success").and_then(Value::as_bool) == Some(true)
}

fn payload_error(payload: &Value) -> String {
    match payload {
        Value::Object(map) => map
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        other => other.to_string(),
    }
}

fn screenshot_path(payload: &Value) -> Option<&str> {
    payload
        .get("screenshot_path")
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty())
}

/// Lays out forecast data that arrives as JSON with a per-day list; anything
/// else is returned unchanged.
pub fn format_forecast(data: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return data.to_string();
    };
    let Some(days) = parsed.get(FORECAST_KEY).and_then(Value::as_array) else {
        return data.to_string();
    };

    let mut out = String::new();
    for day in days {
        let Some(date) = day.get("date") else {
            return data.to_string();
        };
        out.push_str(&format!("Date: {}\n", display(Some(date))));
        out.push_str(&format!(
            "Temperature: {}°C - {}\n",
            display(day.get("daytime_temperature")),
            display(day.get("nighttime_temperature"))
        ));
        out.push_str(&format!("Humidity: {}\n", display(day.get("humidity"))));
        out.push_str(&format!("Weather: {}\n", display(day.get("weather"))));
        out.push_str(&"-".repeat(40));
        out.push('\n');
    }
    out
}

fn display(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Tool-result block content handed back to the model, and its error flag.
pub fn tool_result_for_model(tool_name: &str, result: &ToolResult) -> (Value, bool) {
    let payload = match result {
        ToolResult::Failure { error, .. } => return (json!({"error": error}), true),
        ToolResult::Success { payload } => payload,
    };

    match payload.get("success").and_then(Value::as_bool) {
        Some(true) => match WeatherCategory::from_tool_name(tool_name) {
            Some(category) => {
                let data = match payload.get(category.data_field()) {
                    Some(Value::Null) | None => Value::String(category.missing_data().to_string()),
                    Some(data) => data.clone(),
                };
                let screenshot = screenshot_path(payload).unwrap_or(NO_SCREENSHOT);
                (json!({"result": data, "screenshot": screenshot}), false)
            }
            None => (json!({"result": payload}), false),
        },
        Some(false) => {
            let error = payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            (json!({"error": error}), false)
        }
        None => (json!({"result": payload}), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(category: WeatherCategory) -> Route {
        Route {
            category,
            defaulted: false,
        }
    }

    #[test]
    fn current_with_screenshot() {
        let result = ToolResult::success(json!({
            "success": true,
            "weather_data": "Sunny, 28°C",
            "screenshot_path": "/tmp/hk_current_weather_ab12cd34.png"
        }));
        assert_eq!(
            render_outcome(route(WeatherCategory::Current), &result),
            "Current Weather in Hong Kong:\n\nSunny, 28°C\n\nA screenshot has been saved to: /tmp/hk_current_weather_ab12cd34.png"
        );
    }

    #[test]
    fn missing_screenshot_and_data() {
        let result = ToolResult::success(json!({"success": true, "screenshot_path": null}));
        assert_eq!(
            render_outcome(route(WeatherCategory::Warnings), &result),
            "Weather Warnings for Hong Kong:\n\nNo warnings data available"
        );
    }

    #[test]
    fn defaulted_route_omits_screenshot_and_uses_generic_error() {
        let defaulted = Route {
            category: WeatherCategory::Current,
            defaulted: true,
        };
        let ok = ToolResult::success(json!({"success": true, "weather_data": "Fine", "screenshot_path": "/tmp/x.png"}));
        assert_eq!(render_outcome(defaulted, &ok), "Current Weather in Hong Kong:\n\nFine");

        let failed = ToolResult::failure("browser crashed");
        assert_eq!(
            render_outcome(defaulted, &failed),
            "Error retrieving weather information: browser crashed"
        );
    }

    #[test]
    fn category_error_prefixes() {
        let failed = ToolResult::success(json!({"success": false, "error": "timeout"}));
        assert_eq!(
            render_outcome(route(WeatherCategory::Current), &failed),
            "Error retrieving current weather: timeout"
        );
        assert_eq!(
            render_outcome(route(WeatherCategory::Forecast), &failed),
            "Error retrieving forecast: timeout"
        );
        assert_eq!(
            render_outcome(route(WeatherCategory::Warnings), &failed),
            "Error retrieving weather warnings: timeout"
        );
    }

    #[test]
    fn forecast_json_is_laid_out_per_day() {
        let data = json!({
            "9-day_weather_forecast": [
                {"date": "20 Oct", "daytime_temperature": 29, "nighttime_temperature": "24°C", "humidity": "70-90%", "weather": "Sunny periods"},
                {"date": "21 Oct"}
            ]
        })
        .to_string();
        let formatted = format_forecast(&data);
        assert!(formatted.starts_with("Date: 20 Oct\nTemperature: 29°C - 24°C\nHumidity: 70-90%\nWeather: Sunny periods\n"));
        assert!(formatted.contains("Date: 21 Oct\nTemperature: N/A°C - N/A\n"));
        assert_eq!(formatted.matches(&"-".repeat(40)).count(), 2);

        assert_eq!(format_forecast("Mainly fine"), "Mainly fine");
        assert_eq!(format_forecast("{\"other\": 1}"), "{\"other\": 1}");
    }

    #[test]
    fn model_tool_results() {
        let ok = ToolResult::success(json!({"success": true, "forecast_data": "Showers", "screenshot_path": null}));
        assert_eq!(
            tool_result_for_model("get_hk_forecast", &ok),
            (json!({"result": "Showers", "screenshot": "No screenshot available"}), false)
        );

        let bare = ToolResult::success(json!({"success": true}));
        assert_eq!(
            tool_result_for_model("get_hk_current_weather", &bare).0,
            json!({"result": "No weather data available", "screenshot": "No screenshot available"})
        );

        assert_eq!(
            tool_result_for_model("other_tool", &bare).0,
            json!({"result": {"success": true}})
        );
        assert_eq!(
            tool_result_for_model("get_hk_forecast", &ToolResult::success(json!({"success": false}))).0,
            json!({"error": "Unknown error"})
        );
        assert_eq!(
            tool_result_for_model("get_hk_forecast", &ToolResult::success(json!([1, 2]))).0,
            json!({"result": [1, 2]})
        );
        assert_eq!(
            tool_result_for_model("get_hk_forecast", &ToolResult::failure("connection reset")),
            (json!({"error": "connection reset"}), true)
        );
    }
}
