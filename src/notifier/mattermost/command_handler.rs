// notifier/mattermost/command_handler.rs

use crate::config::AppConfig;
use crate::formatter::{self, LEGEND, MENU_UNAVAILABLE};
use crate::model::{MenuDay, Post};
use crate::notifier::MessageSender;
use crate::parser::{CanteenParser, Parser};
use crate::scraper::Scraper;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

pub const ALIVE_REPLY: &str = "Yes I'm up and running!";
pub const FALLBACK_REPLY: &str = "What does this even mean?!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Alive,
    Today,
    Tomorrow,
    Legend,
    Help,
    Fallback,
}

/// Keyword patterns in priority order. A keyword only counts as a whole word.
static INTENT_PATTERNS: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    [
        (Intent::Alive, "alive|running|up"),
        (Intent::Today, "heute|today"),
        (Intent::Tomorrow, "morgen|tomorrow"),
        (Intent::Legend, "legende?"),
        (Intent::Help, "command|help"),
    ]
    .into_iter()
    .map(|(intent, words)| {
        let pattern = format!(r"(?i)(?:^|\W)(?:{})(?:$|\W)", words);
        let regex = Regex::new(&pattern).expect("intent pattern is a valid regex");
        (intent, regex)
    })
    .collect()
});

impl Intent {
    pub fn classify(text: &str) -> Intent {
        INTENT_PATTERNS
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Fallback)
    }
}

/// Turns a triggering post into a reply. Holds no per-message state.
pub struct CommandHandler {
    scraper: Arc<dyn Scraper>,
    parser: CanteenParser,
    config: Arc<AppConfig>,
}

impl CommandHandler {
    pub fn new(scraper: Arc<dyn Scraper>, config: Arc<AppConfig>) -> Self {
        Self {
            scraper,
            parser: CanteenParser::new(),
            config,
        }
    }

    /// Classifies `text` and builds the reply message for it.
    pub async fn reply_for(&self, text: &str) -> String {
        match Intent::classify(text) {
            Intent::Alive => ALIVE_REPLY.to_string(),
            Intent::Today => self.menu(MenuDay::Today).await,
            Intent::Tomorrow => self.menu(MenuDay::Tomorrow).await,
            Intent::Legend => LEGEND.to_string(),
            Intent::Help => formatter::help_text(&self.config.mention_name),
            Intent::Fallback => FALLBACK_REPLY.to_string(),
        }
    }

    /// Fetches, parses and formats the plan for `day`. Fetch and parse
    /// failures become a user-facing notice instead of an error.
    pub async fn menu(&self, day: MenuDay) -> String {
        let url = self.config.menu_url(day);
        let html = match self.scraper.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Canteen fetch failed for {:?}: {}", day, e);
                return MENU_UNAVAILABLE.to_string();
            }
        };

        match self.parser.parse(&html) {
            Ok(dishes) => {
                info!("Parsed {} dishes for {:?}", dishes.len(), day);
                formatter::format_menu(day.header(), &dishes, &self.config.favorites)
            }
            Err(e) => {
                warn!("Canteen parse failed for {:?}: {}", day, e);
                let mut message = formatter::format_menu(day.header(), &[], &self.config.favorites);
                message.push('\n');
                message.push_str(MENU_UNAVAILABLE);
                message
            }
        }
    }

    /// Answers `post` with a threaded reply in its channel. Send failures
    /// are logged and swallowed.
    pub async fn handle_command(&self, post: &Post, sender: &dyn MessageSender) {
        info!("Handling post {}: {}", post.id, post.message);
        let reply = self.reply_for(&post.message).await;
        if let Err(e) = sender
            .send_message(&reply, &post.channel_id, Some(&post.id))
            .await
        {
            warn!("Reply to post {} failed: {}", post.id, e);
        }
    }
}
