pub mod browser;
pub mod category;
pub mod chromium;
pub mod fetcher;

pub use browser::{ActResult, BrowserEngine, BrowserError, BrowserSession};
pub use category::WeatherCategory;
pub use chromium::{ChromiumEngine, PageExtractor};
pub use fetcher::{FetchOptions, WeatherFetcher, WeatherReport};
