use crate::model::{ConfigError, MenuDay};
use crate::utils::RetryPolicy;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const DEFAULT_TODAY_URL: &str = "http://speiseplan.studierendenwerk-hamburg.de/de/580/2018/0/";
pub const DEFAULT_TOMORROW_URL: &str = "http://speiseplan.studierendenwerk-hamburg.de/de/580/2018/99/";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server base URL, e.g. `https://chat.example.org`. `/api/v4` is appended.
    pub mattermost_api_url: String,
    pub user_email: String,
    pub user_password: String,
    pub team_name: String,

    pub display_name: String,
    /// Literal prefix (usually `@botname`) that turns a post into a command.
    pub mention_name: String,

    pub channel_name_debug: String,
    pub channel_name_production: String,

    #[serde(default)]
    pub favorites: Vec<String>,

    #[serde(default = "default_today_url")]
    pub today_url: String,
    #[serde(default = "default_tomorrow_url")]
    pub tomorrow_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// How often the list of channels the bot is a member of is reloaded.
    #[serde(default = "default_channel_refresh")]
    pub channel_refresh_seconds: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_today_url() -> String {
    DEFAULT_TODAY_URL.to_string()
}

fn default_tomorrow_url() -> String {
    DEFAULT_TOMORROW_URL.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    2
}

fn default_channel_refresh() -> u64 {
    60
}

impl AppConfig {
    pub fn menu_url(&self, day: MenuDay) -> &str {
        match day {
            MenuDay::Today => &self.today_url,
            MenuDay::Tomorrow => &self.tomorrow_url,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("mattermost_api_url", &self.mattermost_api_url),
            ("team_name", &self.team_name),
            ("mention_name", &self.mention_name),
            ("channel_name_debug", &self.channel_name_debug),
            ("channel_name_production", &self.channel_name_production),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("`{}` must not be empty", field)));
            }
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "`request_timeout_seconds` must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    config.mattermost_api_url = config.mattermost_api_url.trim_end_matches('/').to_string();
    config.favorites = config
        .favorites
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();
    Ok(config)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
