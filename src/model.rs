// Core structs: Dish, MenuDay, Mattermost wire types and error enums
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::utils::Transient;

/// One menu item of a canteen day.
///
/// Flags derive only from the icon titles found inside the dish node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dish {
    pub name: String,
    /// Price tiers in page order (student / staff / guest). A fourth price
    /// cell on the page is dropped.
    pub prices: [String; 3],
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub contains_beef: bool,
    pub contains_pork: bool,
    pub contains_fish: bool,
    pub contains_chicken: bool,
    pub lactose_free: bool,
}

impl Dish {
    /// `favorites` are expected in lowercase (see `AppConfig`).
    pub fn is_favorite(&self, favorites: &[String]) -> bool {
        let name = self.name.to_lowercase();
        favorites.iter().any(|f| name.contains(f.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuDay {
    Today,
    Tomorrow,
}

impl MenuDay {
    pub fn header(&self) -> &'static str {
        match self {
            MenuDay::Today => "**Heute gibt es:**",
            MenuDay::Tomorrow => "**Morgen gibt es:**",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub channel_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub create_at: i64,
    #[serde(default)]
    pub delete_at: i64,
    /// Empty for regular user posts, `system_*` for join/leave notices etc.
    #[serde(rename = "type", default)]
    pub post_type: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostList {
    #[serde(default)]
    pub posts: HashMap<String, Post>,
}

#[derive(Debug, Serialize)]
pub struct NewPost<'a> {
    pub channel_id: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected response status {0}")]
    InvalidResponse(u16),
}

impl Transient for ScraperError {
    fn is_transient(&self) -> bool {
        match self {
            ScraperError::HttpError(_) | ScraperError::Timeout => true,
            ScraperError::InvalidResponse(status) => is_transient_status(*status),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("HTML parse error: {0}")]
    HtmlParseError(String),
    #[error("empty document")]
    EmptyDocument,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("API request failed: {0}")]
    ApiError(String),
    #[error("API responded with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("missing field in API response: {0}")]
    MissingField(String),
    #[error("chat server unreachable (timeout)")]
    Unreachable,
}

impl Transient for NotifyError {
    fn is_transient(&self) -> bool {
        match self {
            NotifyError::ApiError(_) | NotifyError::Unreachable => true,
            NotifyError::Rejected { status, .. } => is_transient_status(*status),
            NotifyError::MissingField(_) => false,
        }
    }
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
