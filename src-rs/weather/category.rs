use serde::{Deserialize, Serialize};
use std::fmt;

const CURRENT_PAGE: &str = "https://www.hko.gov.hk/en/wxinfo/currwx/current.htm";
const FORECAST_PAGE: &str = "https://www.hko.gov.hk/en/wxinfo/currwx/fnd.htm";
const WARNINGS_PAGE: &str = "https://www.hko.gov.hk/en/wxinfo/currwx/warning.htm";

/// The three things the Observatory site is asked about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    Current,
    Forecast,
    Warnings,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 3] = [
        WeatherCategory::Current,
        WeatherCategory::Forecast,
        WeatherCategory::Warnings,
    ];

    pub fn tool_name(self) -> &'static str {
        match self {
            WeatherCategory::Current => "get_hk_current_weather",
            WeatherCategory::Forecast => "get_hk_forecast",
            WeatherCategory::Warnings => "get_hk_weather_warnings",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.tool_name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            WeatherCategory::Current => {
                "Get the current weather in Hong Kong from the Hong Kong Observatory website."
            }
            WeatherCategory::Forecast => {
                "Get the weather forecast for Hong Kong from the Hong Kong Observatory website."
            }
            WeatherCategory::Warnings => "Get current weather warnings and alerts for Hong Kong.",
        }
    }

    pub fn starting_page(self) -> &'static str {
        match self {
            WeatherCategory::Current => CURRENT_PAGE,
            WeatherCategory::Forecast => FORECAST_PAGE,
            WeatherCategory::Warnings => WARNINGS_PAGE,
        }
    }

    /// Natural-language instruction given to the browser session.
    pub fn instruction(self) -> &'static str {
        match self {
            WeatherCategory::Current => {
                "Read and extract the current weather information for Hong Kong including temperature, humidity, and weather conditions"
            }
            WeatherCategory::Forecast => {
                "Read and extract the complete 9-day weather forecast information visible on this page"
            }
            WeatherCategory::Warnings => {
                "Read and extract any current weather warnings or alerts for Hong Kong"
            }
        }
    }

    pub fn screenshot_prefix(self) -> &'static str {
        match self {
            WeatherCategory::Current => "hk_current_weather",
            WeatherCategory::Forecast => "hk_forecast",
            WeatherCategory::Warnings => "hk_warnings",
        }
    }

    /// Payload field holding the extracted text.
    pub fn data_field(self) -> &'static str {
        match self {
            WeatherCategory::Current => "weather_data",
            WeatherCategory::Forecast => "forecast_data",
            WeatherCategory::Warnings => "warnings_data",
        }
    }

    pub fn missing_data(self) -> &'static str {
        match self {
            WeatherCategory::Current => "No weather data available",
            WeatherCategory::Forecast => "No forecast data available",
            WeatherCategory::Warnings => "No warnings data available",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            WeatherCategory::Current => "Current Weather in Hong Kong:",
            WeatherCategory::Forecast => "9-Day Weather Forecast for Hong Kong:",
            WeatherCategory::Warnings => "Weather Warnings for Hong Kong:",
        }
    }

    /// Used in "Error retrieving <subject>: ..." lines.
    pub fn subject(self) -> &'static str {
        match self {
            WeatherCategory::Current => "current weather",
            WeatherCategory::Forecast => "forecast",
            WeatherCategory::Warnings => "weather warnings",
        }
    }

    pub fn success_message(self, days: u32) -> String {
        match self {
            WeatherCategory::Current => "Successfully retrieved current weather in Hong Kong".to_string(),
            WeatherCategory::Forecast => format!("Successfully retrieved {}-day forecast for Hong Kong", days),
            WeatherCategory::Warnings => "Successfully retrieved weather warnings for Hong Kong".to_string(),
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WeatherCategory::Current => "current",
            WeatherCategory::Forecast => "forecast",
            WeatherCategory::Warnings => "warnings",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip() {
        for category in WeatherCategory::ALL {
            assert_eq!(WeatherCategory::from_tool_name(category.tool_name()), Some(category));
        }
        assert_eq!(WeatherCategory::from_tool_name("get_hk_tides"), None);
    }

    #[test]
    fn forecast_message_mentions_days() {
        assert_eq!(
            WeatherCategory::Forecast.success_message(5),
            "Successfully retrieved 5-day forecast for Hong Kong"
        );
    }
}
