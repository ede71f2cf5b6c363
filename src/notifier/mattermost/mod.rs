pub mod api;
pub mod command_handler;
pub mod listener;
pub mod sender;

use crate::config::AppConfig;
use crate::model::{Channel, NotifyError, PostList, Team, User};
use crate::notifier::{MessageSender, PostSource};
use crate::utils::retry;
use api::MattermostApi;
use command_handler::CommandHandler;
use listener::Listener;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

/// Logged-in bot session on one Mattermost team.
pub struct MattermostNotifier {
    pub api: MattermostApi,
    pub user: User,
    pub team: Team,
    pub channel_debug: Channel,
    pub channel_production: Channel,
    pub config: Arc<AppConfig>,
    pub start_time: Instant,
}

impl MattermostNotifier {
    /// Pings the server, logs in, and resolves the team and both channels.
    /// Transient failures are retried with the configured policy.
    pub async fn connect(config: Arc<AppConfig>) -> Result<Self, NotifyError> {
        let policy = &config.retry;
        info!("Connecting to {}", config.mattermost_api_url);
        let mut api = MattermostApi::new(
            &config.mattermost_api_url,
            Duration::from_secs(config.request_timeout_seconds),
        )?;

        let status = retry(policy, "server ping", || api.ping()).await?;
        info!("Server detected and responding, status {}", status);

        let (token, user) = retry(policy, "login", || {
            api.login(&config.user_email, &config.user_password)
        })
        .await?;
        api.set_token(token);
        info!("Logged in as '{}' ({}): {}", user.username, config.user_email, user.id);

        let team = retry(policy, "team lookup", || api.team_by_name(&config.team_name)).await?;
        info!("Got team with name '{}': {}", config.team_name, team.id);

        let channel_debug = retry(policy, "channel lookup", || {
            api.channel_by_name(&team.id, &config.channel_name_debug)
        })
        .await?;
        info!("Got channel with name '{}': {}", config.channel_name_debug, channel_debug.id);

        let channel_production = retry(policy, "channel lookup", || {
            api.channel_by_name(&team.id, &config.channel_name_production)
        })
        .await?;
        info!(
            "Got channel with name '{}': {}",
            config.channel_name_production, channel_production.id
        );

        Ok(Self {
            api,
            user,
            team,
            channel_debug,
            channel_production,
            config,
            start_time: Instant::now(),
        })
    }

    /// Posts `text` into the debug channel (start/stop notices).
    pub async fn notify_debug(&self, text: &str) -> Result<(), NotifyError> {
        sender::send_message(self, text, &self.channel_debug.id, None).await
    }

    /// Polls every channel the bot is a member of until `shutdown` fires.
    pub async fn listen_for_commands(&self, handler: &CommandHandler, shutdown: &Notify) {
        let listener = Listener {
            source: self,
            sender: self,
            handler,
            bot_user_id: &self.user.id,
            mention_name: &self.config.mention_name,
            debug_channel_id: &self.channel_debug.id,
            poll_interval: Duration::from_secs(self.config.poll_interval_seconds),
            channel_refresh_interval: Duration::from_secs(self.config.channel_refresh_seconds),
            retry: &self.config.retry,
        };
        listener.run(shutdown).await;
    }

    pub fn spawn_listener(
        notifier: Arc<MattermostNotifier>,
        handler: Arc<CommandHandler>,
        shutdown: Arc<Notify>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("▶️ Starting Mattermost listener...");
            notifier.listen_for_commands(&handler, &shutdown).await;
            tracing::info!(
                "🛑 Mattermost listener ended after {}s.",
                notifier.start_time.elapsed().as_secs()
            );
        })
    }
}

#[async_trait::async_trait]
impl MessageSender for MattermostNotifier {
    async fn send_message(
        &self,
        text: &str,
        channel_id: &str,
        root_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        sender::send_message(self, text, channel_id, root_id).await
    }
}

#[async_trait::async_trait]
impl PostSource for MattermostNotifier {
    /// Team channels the bot belongs to, plus the two configured channels.
    async fn watched_channels(&self) -> Result<Vec<String>, NotifyError> {
        let mut ids: Vec<String> = self
            .api
            .my_channels(&self.team.id)
            .await?
            .into_iter()
            .map(|channel| channel.id)
            .collect();
        for configured in [&self.channel_debug.id, &self.channel_production.id] {
            if !ids.contains(configured) {
                ids.push(configured.clone());
            }
        }
        Ok(ids)
    }

    async fn latest_posts(&self, channel_id: &str) -> Result<PostList, NotifyError> {
        self.api.latest_posts(channel_id).await
    }

    async fn posts_since(&self, channel_id: &str, since: i64) -> Result<PostList, NotifyError> {
        self.api.posts_since(channel_id, since).await
    }
}
