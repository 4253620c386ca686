use async_trait::async_trait;
use ulid::Ulid;

use crate::{
    client::{parse_json_if_ok, RevoltClient},
    error::RevoltError,
    types::message::{DataMessageSend, Message, SendableEmbed},
    util::build_url,
};

/// Message endpoints.
#[async_trait]
pub trait MessagesApi {
    /// Send a plain text message to the given channel.
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<Message, RevoltError>;

    /// Send a message made of embeds only.
    async fn send_embeds(
        &self,
        channel_id: &str,
        embeds: Vec<SendableEmbed>,
    ) -> Result<Message, RevoltError>;
}

impl RevoltClient {
    async fn post_message(
        &self,
        channel_id: &str,
        mut body: DataMessageSend,
    ) -> Result<Message, RevoltError> {
        let url = build_url(&self.base_url, &["channels", channel_id, "messages"]);

        // The nonce doubles as the idempotency key so a retried POST cannot
        // double-send.
        let nonce = body.nonce.get_or_insert_with(|| Ulid::new().to_string()).clone();

        let resp = self
            .authed_post(&url, &body, &[("Idempotency-Key", nonce.as_str())])
            .await?;

        parse_json_if_ok(resp).await
    }
}

#[async_trait]
impl MessagesApi for RevoltClient {
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<Message, RevoltError> {
        let body = DataMessageSend {
            content: Some(content.to_string()),
            ..Default::default()
        };
        self.post_message(channel_id, body).await
    }

    async fn send_embeds(
        &self,
        channel_id: &str,
        embeds: Vec<SendableEmbed>,
    ) -> Result<Message, RevoltError> {
        let body = DataMessageSend {
            embeds: Some(embeds),
            ..Default::default()
        };
        self.post_message(channel_id, body).await
    }
}
