use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::weather::WeatherCategory;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DispatchMode {
    /// The language model picks tools.
    Model,
    /// Fixed keyword matching, one tool per query.
    Keyword,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "model" | "llm" => Ok(DispatchMode::Model),
            "keyword" | "direct" => Ok(DispatchMode::Keyword),
            other => Err(format!("unknown dispatch mode: {}", other)),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMode::Model => write!(f, "model"),
            DispatchMode::Keyword => write!(f, "keyword"),
        }
    }
}

/// Where keyword dispatch sends a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub category: WeatherCategory,
    /// No keyword matched.
    pub defaulted: bool,
}

const KEYWORDS: [(WeatherCategory, &[&str]); 3] = [
    (WeatherCategory::Current, &["current", "now", "today"]),
    (WeatherCategory::Forecast, &["forecast", "week", "days", "tomorrow"]),
    (WeatherCategory::Warnings, &["warning", "alert"]),
];

pub fn keyword_route(query: &str) -> Route {
    let query = query.to_lowercase();
    for (category, words) in KEYWORDS {
        if words.iter().any(|word| query.contains(word)) {
            return Route {
                category,
                defaulted: false,
            };
        }
    }
    Route {
        category: WeatherCategory::Current,
        defaulted: true,
    }
}
