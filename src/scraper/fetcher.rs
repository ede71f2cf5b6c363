use crate::model::ScraperError;
use crate::scraper::traits::Scraper;
use crate::utils::{retry, RetryPolicy};

use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

pub struct ScraperImpl {
    client: Client,
    request_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl ScraperImpl {
    pub fn new(request_timeout: Duration, retry_policy: RetryPolicy) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) MensaBot/0.1")
            .timeout(request_timeout)
            .build()
            .map_err(|e| ScraperError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout,
            retry_policy,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String, ScraperError> {
        let response = match timeout(self.request_timeout, self.client.get(url).send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(ScraperError::Timeout),
            Ok(Err(e)) => return Err(ScraperError::HttpError(e.to_string())),
            Err(_) => return Err(ScraperError::Timeout),
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Canteen page {} responded [{}]", url, status);
            return Err(ScraperError::InvalidResponse(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ScraperError::HttpError(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Scraper for ScraperImpl {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        info!("Fetching canteen plan: {}", url);
        let html = retry(&self.retry_policy, "canteen fetch", || self.fetch_once(url)).await?;
        info!("Fetched {} bytes from {}", html.len(), url);
        Ok(html)
    }
}
