// notifier/mattermost/api.rs

use crate::model::{Channel, NewPost, NotifyError, PostList, Team, User};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

const LATEST_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct PingResponse {
    #[serde(default)]
    status: String,
}

/// Thin client for the Mattermost REST API v4.
pub struct MattermostApi {
    client: Client,
    base_url: String,
    token: String,
    request_timeout: Duration,
}

impl MattermostApi {
    pub fn new(server_url: &str, request_timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NotifyError::ApiError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: format!("{}/api/v4", server_url.trim_end_matches('/')),
            token: String::new(),
            request_timeout,
        })
    }

    pub fn set_token(&mut self, token: String) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    /// Sends `request` under the configured timeout and maps non-2xx answers
    /// to `NotifyError::Rejected`.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, NotifyError> {
        let response = match timeout(self.request_timeout, self.authorized(request).send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) if e.is_timeout() => return Err(NotifyError::Unreachable),
            Ok(Err(e)) => return Err(NotifyError::ApiError(e.to_string())),
            Err(_) => return Err(NotifyError::Unreachable),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown".into());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NotifyError> {
        debug!("GET {}", path);
        let response = self.execute(self.client.get(self.url(path))).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| NotifyError::ApiError(format!("Invalid response for {}: {}", path, e)))
    }

    /// Returns the status reported by `/system/ping`.
    pub async fn ping(&self) -> Result<String, NotifyError> {
        let ping: PingResponse = self.get_json("/system/ping").await?;
        Ok(ping.status)
    }

    /// Logs in with email and password. Returns the session token and the
    /// bot's own user record.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), NotifyError> {
        let request = self
            .client
            .post(self.url("/users/login"))
            .json(&json!({ "login_id": email, "password": password }));
        let response = self.execute(request).await?;

        let token = response
            .headers()
            .get("Token")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| NotifyError::MissingField("Token header".into()))?;
        let user = response
            .json::<User>()
            .await
            .map_err(|e| NotifyError::ApiError(format!("Invalid login response: {}", e)))?;

        Ok((token, user))
    }

    pub async fn team_by_name(&self, team_name: &str) -> Result<Team, NotifyError> {
        self.get_json(&format!("/teams/name/{}", team_name)).await
    }

    pub async fn channel_by_name(&self, team_id: &str, channel_name: &str) -> Result<Channel, NotifyError> {
        self.get_json(&format!("/teams/{}/channels/name/{}", team_id, channel_name))
            .await
    }

    /// Channels of `team_id` the logged-in user is a member of.
    pub async fn my_channels(&self, team_id: &str) -> Result<Vec<Channel>, NotifyError> {
        self.get_json(&format!("/users/me/teams/{}/channels", team_id)).await
    }

    /// Newest page of posts in `channel_id`, used to place the first cursor.
    pub async fn latest_posts(&self, channel_id: &str) -> Result<PostList, NotifyError> {
        self.get_json(&format!(
            "/channels/{}/posts?page=0&per_page={}",
            channel_id, LATEST_PAGE_SIZE
        ))
        .await
    }

    /// Posts of `channel_id` created or changed after `since` (epoch millis).
    pub async fn posts_since(&self, channel_id: &str, since: i64) -> Result<PostList, NotifyError> {
        self.get_json(&format!("/channels/{}/posts?since={}", channel_id, since))
            .await
    }

    pub async fn create_post(&self, post: &NewPost<'_>) -> Result<(), NotifyError> {
        let request = self.client.post(self.url("/posts")).json(post);
        self.execute(request).await?;
        Ok(())
    }
}
