pub mod config;
pub mod formatter;
pub mod model;
pub mod notifier;
pub mod parser;
pub mod scraper;
pub mod utils;
