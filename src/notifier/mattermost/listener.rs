// notifier/mattermost/listener.rs

use crate::model::{Post, PostList};
use crate::notifier::mattermost::command_handler::CommandHandler;
use crate::notifier::{MessageSender, PostSource};
use crate::utils::RetryPolicy;
use chrono::DateTime;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Notify;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

/// Read position in one channel, in server time.
///
/// `since` is inclusive, so posts sharing the cursor millisecond are still
/// returned by the server; `seen_at_since` holds the ids already handled at
/// that millisecond.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCursor {
    pub since: i64,
    pub seen_at_since: HashSet<String>,
}

impl ChannelCursor {
    /// Places the cursor on the newest post of `list`, so nothing already in
    /// the channel is handled.
    pub fn baseline(list: PostList) -> Self {
        let mut cursor = Self::default();
        for post in list.posts.into_values() {
            cursor.advance(&post);
        }
        cursor
    }

    /// Returns the posts of `list` not handled yet, oldest first, and moves
    /// the cursor past them.
    pub fn take_new(&mut self, list: PostList) -> Vec<Post> {
        let posts = new_posts(list, self.since, &self.seen_at_since);
        for post in &posts {
            self.advance(post);
        }
        posts
    }

    fn advance(&mut self, post: &Post) {
        if post.create_at > self.since {
            self.since = post.create_at;
            self.seen_at_since.clear();
        }
        if post.create_at == self.since {
            self.seen_at_since.insert(post.id.clone());
        }
    }
}

/// Posts from `list` created at or after `since` whose ids are not in
/// `seen`, oldest first. Deleted posts and system messages are skipped.
pub fn new_posts(list: PostList, since: i64, seen: &HashSet<String>) -> Vec<Post> {
    let mut posts: Vec<Post> = list
        .posts
        .into_values()
        .filter(|p| p.create_at >= since && !seen.contains(&p.id))
        .filter(|p| p.delete_at == 0 && p.post_type.is_empty())
        .collect();
    posts.sort_by(|a, b| a.create_at.cmp(&b.create_at).then_with(|| a.id.cmp(&b.id)));
    posts
}

fn server_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

/// A post is a command if someone other than the bot wrote it and it either
/// starts with the mention prefix or was posted in the debug channel.
pub fn is_command(post: &Post, bot_user_id: &str, mention_name: &str, debug_channel_id: &str) -> bool {
    if post.user_id == bot_user_id {
        return false;
    }
    post.message.starts_with(mention_name) || post.channel_id == debug_channel_id
}

/// Poll loop over every watched channel. Commands are handled one at a time,
/// oldest first per channel.
pub struct Listener<'a> {
    pub source: &'a dyn PostSource,
    pub sender: &'a dyn MessageSender,
    pub handler: &'a CommandHandler,
    pub bot_user_id: &'a str,
    pub mention_name: &'a str,
    pub debug_channel_id: &'a str,
    pub poll_interval: Duration,
    pub channel_refresh_interval: Duration,
    pub retry: &'a RetryPolicy,
}

impl Listener<'_> {
    /// Runs until `shutdown` is notified. Failed polls back off with the
    /// retry policy and never end the loop.
    pub async fn run(&self, shutdown: &Notify) {
        // `None` until the channel's first cursor is placed.
        let mut cursors: BTreeMap<String, Option<ChannelCursor>> = BTreeMap::new();
        let mut last_refresh: Option<Instant> = None;
        let mut consecutive_failures: u32 = 0;

        loop {
            let mut failed = false;

            let refresh_due = last_refresh.map_or(true, |at| at.elapsed() >= self.channel_refresh_interval);
            if refresh_due {
                match self.source.watched_channels().await {
                    Ok(channel_ids) => {
                        cursors.retain(|id, _| channel_ids.contains(id));
                        for id in channel_ids {
                            cursors.entry(id).or_insert(None);
                        }
                        debug!("Watching {} channels", cursors.len());
                        last_refresh = Some(Instant::now());
                    }
                    Err(e) => {
                        warn!("Loading the channel list failed: {}", e);
                        failed = true;
                    }
                }
            }

            let polls = join_all(cursors.iter().map(|(channel_id, cursor)| async move {
                match cursor {
                    Some(cursor) => self.source.posts_since(channel_id, cursor.since).await,
                    None => self.source.latest_posts(channel_id).await,
                }
            }))
            .await;
            let channel_ids: Vec<String> = cursors.keys().cloned().collect();

            for (channel_id, result) in channel_ids.into_iter().zip(polls) {
                let list = match result {
                    Ok(list) => list,
                    Err(e) => {
                        warn!("Polling channel {} failed: {}", channel_id, e);
                        failed = true;
                        continue;
                    }
                };

                let Some(slot) = cursors.get_mut(&channel_id) else {
                    continue;
                };
                if slot.is_none() {
                    let cursor = ChannelCursor::baseline(list);
                    debug!("Channel {} starts at {}", channel_id, server_time(cursor.since));
                    *slot = Some(cursor);
                    continue;
                }
                let Some(cursor) = slot.as_mut() else {
                    continue;
                };

                for post in cursor.take_new(list) {
                    debug!("New post {} in channel {}", post.id, post.channel_id);
                    if is_command(&post, self.bot_user_id, self.mention_name, self.debug_channel_id) {
                        self.handler.handle_command(&post, self.sender).await;
                    }
                }
            }

            let delay = if failed {
                let delay = self.retry.backoff(consecutive_failures);
                consecutive_failures = consecutive_failures.saturating_add(1);
                info!("Reconnecting in {:?} (failure #{})", delay, consecutive_failures);
                delay
            } else {
                consecutive_failures = 0;
                self.poll_interval
            };

            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown.notified() => {
                    info!("Shutdown requested, closing listener.");
                    return;
                }
            }
        }
    }
}
