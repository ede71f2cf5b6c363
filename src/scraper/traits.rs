use crate::model::ScraperError;

/// Fetches a canteen-plan page and returns its HTML body.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError>;
}
