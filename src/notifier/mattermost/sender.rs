// notifier/mattermost/sender.rs

use crate::model::{NewPost, NotifyError};
use crate::notifier::mattermost::MattermostNotifier;
use crate::utils::retry;
use tracing::{info, warn};

/// Creates a post, threaded under `root_id` when given.
pub async fn send_message(
    notifier: &MattermostNotifier,
    text: &str,
    channel_id: &str,
    root_id: Option<&str>,
) -> Result<(), NotifyError> {
    let post = NewPost {
        channel_id,
        message: text,
        root_id,
    };
    info!("📤 Sending message to channel {} ({} chars)", channel_id, text.len());

    match retry(&notifier.config.retry, "create post", || notifier.api.create_post(&post)).await {
        Ok(()) => {
            info!("✅ Message sent to channel {}", channel_id);
            Ok(())
        }
        Err(e) => {
            warn!("❌ Failed to send a message to channel {}: {}", channel_id, e);
            Err(e)
        }
    }
}
