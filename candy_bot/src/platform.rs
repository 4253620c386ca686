//! The chat platform as the bot sees it.
//!
//! [`Platform`] is the seam between the economy and Revolt. The bot only
//! needs to send text, send leaderboard pages, and answer a few questions
//! about users; [`RevoltPlatform`] answers them with REST lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use revolt_api::{
    types::SendableEmbed, MessagesApi, Permission, RevoltClient, RevoltError, ServersApi,
    UsersApi,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::leaderboard::Page;

/// Accent colour for leaderboard embeds.
const EMBED_COLOUR: &str = "#FF7518";

#[async_trait]
pub trait Platform: Send + Sync + 'static {
    async fn send_text(&self, channel_id: &str, content: &str) -> Result<(), RevoltError>;

    /// One message per page, in order.
    async fn send_pages(&self, channel_id: &str, pages: &[Page]) -> Result<(), RevoltError>;

    /// Whether `user_id` is this bot or another bot account.
    async fn is_automated(&self, user_id: &str) -> bool;

    /// Whether `user_id` holds the moderator permission in the server that
    /// owns `channel_id`. Lookup failures count as "no".
    async fn is_moderator(&self, channel_id: &str, user_id: &str) -> bool;

    /// Whether `user_id` belongs to the server that owns `channel_id`.
    /// Lookup failures count as "no".
    async fn is_member(&self, channel_id: &str, user_id: &str) -> bool;
}

pub struct RevoltPlatform {
    client: RevoltClient,
    permission: Permission,
    self_id: Mutex<Option<String>>,
    bot_cache: Mutex<HashMap<String, bool>>,
}

impl RevoltPlatform {
    pub fn new(client: RevoltClient, permission: Permission) -> Self {
        Self {
            client,
            permission,
            self_id: Mutex::new(None),
            bot_cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn set_self_id(&self, user_id: String) {
        debug!(user_id = %user_id, "bot identity known");
        *self.self_id.lock().await = Some(user_id);
    }

    async fn server_of(&self, channel_id: &str) -> Result<Option<String>, RevoltError> {
        Ok(self.client.fetch_channel(channel_id).await?.server)
    }

    async fn check_moderator(&self, channel_id: &str, user_id: &str) -> Result<bool, RevoltError> {
        let Some(server_id) = self.server_of(channel_id).await? else {
            return Ok(false);
        };
        let server = self.client.fetch_server(&server_id).await?;
        let member = self.client.fetch_member(&server_id, user_id).await?;
        Ok(revolt_api::permissions::has_permission(&server, &member, self.permission))
    }

    async fn check_member(&self, channel_id: &str, user_id: &str) -> Result<bool, RevoltError> {
        let Some(server_id) = self.server_of(channel_id).await? else {
            return Ok(false);
        };
        self.client.fetch_member(&server_id, user_id).await?;
        Ok(true)
    }
}

fn lookup_outcome(
    result: Result<bool, RevoltError>,
    lookup: &'static str,
    channel_id: &str,
    user_id: &str,
) -> bool {
    match result {
        Ok(answer) => answer,
        // Not a member of the server (anymore).
        Err(error) if error.is_not_found() => {
            debug!(channel_id, user_id, lookup, "no membership found");
            false
        }
        Err(error) => {
            warn!(channel_id, user_id, lookup, %error, "member lookup failed");
            false
        }
    }
}

#[async_trait]
impl Platform for RevoltPlatform {
    async fn send_text(&self, channel_id: &str, content: &str) -> Result<(), RevoltError> {
        self.client
            .send_message(channel_id, content)
            .await
            .map(drop)
    }

    async fn send_pages(&self, channel_id: &str, pages: &[Page]) -> Result<(), RevoltError> {
        for page in pages {
            let embed = SendableEmbed {
                title: Some(page.title.clone()),
                description: Some(page.body()),
                colour: Some(EMBED_COLOUR.to_string()),
                ..Default::default()
            };
            self.client.send_embeds(channel_id, vec![embed]).await?;
        }
        Ok(())
    }

    async fn is_automated(&self, user_id: &str) -> bool {
        if self.self_id.lock().await.as_deref() == Some(user_id) {
            return true;
        }
        if let Some(&is_bot) = self.bot_cache.lock().await.get(user_id) {
            return is_bot;
        }

        match self.client.fetch_user(user_id).await {
            Ok(user) => {
                let is_bot = user.is_bot();
                self.bot_cache.lock().await.insert(user_id.to_string(), is_bot);
                is_bot
            }
            Err(error) => {
                warn!(user_id, %error, "could not look up author; treating as human");
                false
            }
        }
    }

    async fn is_moderator(&self, channel_id: &str, user_id: &str) -> bool {
        let result = self.check_moderator(channel_id, user_id).await;
        lookup_outcome(result, "permission", channel_id, user_id)
    }

    async fn is_member(&self, channel_id: &str, user_id: &str) -> bool {
        let result = self.check_member(channel_id, user_id).await;
        lookup_outcome(result, "membership", channel_id, user_id)
    }
}
