use async_trait::async_trait;
use mensa_bot::config::{parse_config, AppConfig};
use mensa_bot::formatter::LEGEND;
use mensa_bot::model::{NotifyError, Post, PostList, ScraperError};
use mensa_bot::notifier::mattermost::command_handler::{CommandHandler, ALIVE_REPLY};
use mensa_bot::notifier::mattermost::listener::Listener;
use mensa_bot::notifier::{MessageSender, PostSource};
use mensa_bot::scraper::Scraper;
use mensa_bot::utils::RetryPolicy;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};

const BOT_USER: &str = "bot-user";
const MENTION: &str = "@bot";
const DEBUG_CHANNEL: &str = "debug";

/// In-memory channel history with a number of `posts_since` calls that fail
/// before the source starts answering.
struct FakeSource {
    channels: Vec<String>,
    posts: Mutex<Vec<Post>>,
    failures_left: AtomicU32,
    successful_polls: AtomicU32,
}

impl FakeSource {
    fn new(channels: &[&str], failures: u32) -> Self {
        Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            posts: Mutex::new(Vec::new()),
            failures_left: AtomicU32::new(failures),
            successful_polls: AtomicU32::new(0),
        }
    }

    fn push(&self, id: &str, channel: &str, message: &str, create_at: i64) {
        self.posts.lock().unwrap().push(Post {
            id: id.into(),
            user_id: "alice".into(),
            channel_id: channel.into(),
            message: message.into(),
            create_at,
            ..Default::default()
        });
    }

    fn list(&self, channel_id: &str, since: i64) -> PostList {
        let mut list = PostList::default();
        for post in self.posts.lock().unwrap().iter() {
            if post.channel_id == channel_id && post.create_at >= since {
                list.posts.insert(post.id.clone(), post.clone());
            }
        }
        list
    }
}

#[async_trait]
impl PostSource for FakeSource {
    async fn watched_channels(&self) -> Result<Vec<String>, NotifyError> {
        Ok(self.channels.clone())
    }

    async fn latest_posts(&self, channel_id: &str) -> Result<PostList, NotifyError> {
        Ok(self.list(channel_id, i64::MIN))
    }

    async fn posts_since(&self, channel_id: &str, since: i64) -> Result<PostList, NotifyError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(NotifyError::Unreachable);
        }
        self.successful_polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.list(channel_id, since))
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String, Option<String>)>>,
}

impl RecordingSender {
    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// `(text, root_id)` of the replies sent into `channel_id`, in order.
    fn replies_in(&self, channel_id: &str) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, channel, _)| channel == channel_id)
            .map(|(text, _, root)| (text.clone(), root.clone().unwrap_or_default()))
            .collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_message(
        &self,
        text: &str,
        channel_id: &str,
        root_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((
            text.to_string(),
            channel_id.to_string(),
            root_id.map(str::to_string),
        ));
        Ok(())
    }
}

struct OfflineScraper;

#[async_trait]
impl Scraper for OfflineScraper {
    async fn fetch(&self, _url: &str) -> Result<String, ScraperError> {
        Err(ScraperError::HttpError("offline".into()))
    }
}

fn config() -> Arc<AppConfig> {
    Arc::new(
        parse_config(
            r#"{
                "mattermost_api_url": "http://chat.test",
                "user_email": "bot@chat.test",
                "user_password": "pw",
                "team_name": "uni",
                "display_name": "MensaBot",
                "mention_name": "@bot",
                "channel_name_debug": "debug",
                "channel_name_production": "mensa"
            }"#,
        )
        .unwrap(),
    )
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay_ms: 1,
        max_delay_ms: 4,
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn listener<'a>(
    source: &'a FakeSource,
    sender: &'a RecordingSender,
    handler: &'a CommandHandler,
    retry: &'a RetryPolicy,
) -> Listener<'a> {
    Listener {
        source,
        sender,
        handler,
        bot_user_id: BOT_USER,
        mention_name: MENTION,
        debug_channel_id: DEBUG_CHANNEL,
        poll_interval: Duration::from_millis(5),
        channel_refresh_interval: Duration::from_millis(20),
        retry,
    }
}

#[tokio::test]
async fn commands_from_every_channel_are_dispatched_once_in_order() {
    let source = FakeSource::new(&[DEBUG_CHANNEL, "mensa", "random"], 1);
    source.push("old", "random", "@bot heute", 5);
    let sender = RecordingSender::default();
    let handler = CommandHandler::new(Arc::new(OfflineScraper), config());
    let retry = fast_retry();
    let shutdown = Notify::new();
    let listener = listener(&source, &sender, &handler, &retry);

    let driver = async {
        wait_until(|| source.successful_polls.load(Ordering::SeqCst) > 0).await;
        source.push("a", "random", "@bot up", 10);
        source.push("b", "random", "@bot legend", 10);
        source.push("p", "mensa", "hello there", 11);
        source.push("d", DEBUG_CHANNEL, "help", 12);
        wait_until(|| sender.count() >= 3).await;
        // Let a few more polls see the same posts again.
        sleep(Duration::from_millis(50)).await;
        shutdown.notify_one();
    };

    timeout(Duration::from_secs(5), async { tokio::join!(listener.run(&shutdown), driver) })
        .await
        .expect("listener stops after shutdown");

    assert_eq!(source.failures_left.load(Ordering::SeqCst), 0);
    assert_eq!(sender.count(), 3);
    assert_eq!(
        sender.replies_in("random"),
        vec![
            (ALIVE_REPLY.to_string(), "a".to_string()),
            (LEGEND.to_string(), "b".to_string()),
        ]
    );
    let debug = sender.replies_in(DEBUG_CHANNEL);
    assert_eq!(debug.len(), 1);
    assert_eq!(debug[0].1, "d");
    assert!(sender.replies_in("mensa").is_empty());
}

#[tokio::test]
async fn post_sharing_the_cursor_millisecond_is_still_dispatched() {
    let source = FakeSource::new(&[DEBUG_CHANNEL], 0);
    let sender = RecordingSender::default();
    let handler = CommandHandler::new(Arc::new(OfflineScraper), config());
    let retry = fast_retry();
    let shutdown = Notify::new();
    let listener = listener(&source, &sender, &handler, &retry);

    let driver = async {
        wait_until(|| source.successful_polls.load(Ordering::SeqCst) > 0).await;
        source.push("first", DEBUG_CHANNEL, "up", 100);
        wait_until(|| sender.count() == 1).await;
        source.push("second", DEBUG_CHANNEL, "legend", 100);
        wait_until(|| sender.count() == 2).await;
        sleep(Duration::from_millis(30)).await;
        shutdown.notify_one();
    };

    timeout(Duration::from_secs(5), async { tokio::join!(listener.run(&shutdown), driver) })
        .await
        .expect("listener stops after shutdown");

    let roots: Vec<String> = sender
        .replies_in(DEBUG_CHANNEL)
        .into_iter()
        .map(|(_, root)| root)
        .collect();
    assert_eq!(roots, vec!["first", "second"]);
}

#[tokio::test]
async fn existing_history_is_not_replayed() {
    let source = FakeSource::new(&[DEBUG_CHANNEL], 0);
    source.push("yesterday", DEBUG_CHANNEL, "heute", 1_000);
    let sender = RecordingSender::default();
    let handler = CommandHandler::new(Arc::new(OfflineScraper), config());
    let retry = fast_retry();
    let shutdown = Notify::new();
    let listener = listener(&source, &sender, &handler, &retry);

    let driver = async {
        wait_until(|| source.successful_polls.load(Ordering::SeqCst) >= 3).await;
        shutdown.notify_one();
    };

    timeout(Duration::from_secs(5), async { tokio::join!(listener.run(&shutdown), driver) })
        .await
        .expect("listener stops after shutdown");

    assert_eq!(sender.count(), 0);
}

#[tokio::test]
async fn notify_one_ends_the_listener() {
    let source = FakeSource::new(&[DEBUG_CHANNEL], 0);
    let sender = RecordingSender::default();
    let handler = CommandHandler::new(Arc::new(OfflineScraper), config());
    let retry = fast_retry();
    let shutdown = Notify::new();
    let listener = listener(&source, &sender, &handler, &retry);

    // A notification sent before the loop waits is kept as a permit.
    shutdown.notify_one();
    let stopped = timeout(Duration::from_secs(1), listener.run(&shutdown)).await;
    assert!(stopped.is_ok());
}
