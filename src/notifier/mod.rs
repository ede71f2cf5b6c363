pub mod mattermost;

use crate::model::{NotifyError, PostList};

pub use mattermost::MattermostNotifier;

/// Outbound side of a chat session: posts `text` into `channel_id`, as a
/// threaded reply when `root_id` is given.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(
        &self,
        text: &str,
        channel_id: &str,
        root_id: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Inbound side of a chat session, polled by the listener.
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    /// Ids of every channel the bot should watch.
    async fn watched_channels(&self) -> Result<Vec<String>, NotifyError>;

    /// Newest posts of a channel, used to place its first cursor.
    async fn latest_posts(&self, channel_id: &str) -> Result<PostList, NotifyError>;

    /// Posts of a channel created or changed at or after `since` (epoch millis).
    async fn posts_since(&self, channel_id: &str, since: i64) -> Result<PostList, NotifyError>;
}
