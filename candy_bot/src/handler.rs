//! Gateway callbacks wired to [`CandyBot`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use revolt_api::{EventHandler, Message, ReadyEvent, RevoltClient, UsersApi};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    bot::{CandyBot, Incoming},
    platform::RevoltPlatform,
};

#[derive(Clone)]
pub struct BotHandler {
    bot: Arc<CandyBot<RevoltPlatform>>,
}

impl BotHandler {
    pub fn new(bot: Arc<CandyBot<RevoltPlatform>>) -> Self {
        Self { bot }
    }
}

/// The Ready payload lists the connected account with relationship `User`.
fn own_user_id(ready: &ReadyEvent) -> Option<String> {
    ready
        .users
        .iter()
        .find(|u| u.get("relationship").and_then(Value::as_str) == Some("User"))
        .and_then(|u| u.get("_id").and_then(Value::as_str))
        .map(str::to_string)
}

#[async_trait]
impl EventHandler for BotHandler {
    async fn on_error_event(&self, _client: &RevoltClient, error_id: &str) {
        error!(error_id, "gateway reported an error");
    }

    async fn on_authenticated(&self, _client: &RevoltClient) {
        info!("authenticated with gateway");
    }

    async fn on_ready(&self, client: &RevoltClient, ready: &ReadyEvent) {
        let self_id = match own_user_id(ready) {
            Some(id) => Some(id),
            None => match client.fetch_user("@me").await {
                Ok(user) => Some(user.id),
                Err(e) => {
                    warn!(error = %e, "could not resolve own user id");
                    None
                }
            },
        };
        if let Some(id) = self_id {
            self.bot.platform().set_self_id(id).await;
        }
        info!(
            servers = ready.servers.len(),
            channels = ready.channels.len(),
            "gateway ready"
        );
    }

    async fn on_message(&self, _client: &RevoltClient, message: &Message) {
        self.bot
            .handle_message(&Incoming::from(message), Utc::now())
            .await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn own_id_comes_from_the_user_relationship() {
        let ready = ReadyEvent {
            users: vec![
                json!({ "_id": "OTHER", "relationship": "None" }),
                json!({ "_id": "ME", "relationship": "User" }),
            ],
            servers: Vec::new(),
            channels: Vec::new(),
        };
        assert_eq!(own_user_id(&ready).as_deref(), Some("ME"));

        let empty = ReadyEvent {
            users: Vec::new(),
            servers: Vec::new(),
            channels: Vec::new(),
        };
        assert_eq!(own_user_id(&empty), None);
    }
}
