use serde::{Deserialize, Serialize};

/// Body for `POST /channels/{id}/messages`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataMessageSend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<SendableEmbed>>,
}

/// A message as delivered by the gateway or returned from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub nonce: Option<String>,
    pub channel: String,
    pub author: String,
    pub user: Option<crate::types::user::User>,
    pub webhook: Option<MessageWebhook>,
    pub content: Option<String>,
    pub system: Option<serde_json::Value>,
    pub mentions: Option<Vec<String>>,
    pub replies: Option<Vec<String>>,
}

impl Message {
    /// Messages produced by the platform itself (joins, renames, ...).
    pub fn is_system(&self) -> bool {
        self.system.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendableEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWebhook {
    pub name: String,
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_body_skips_empty_fields() {
        let body = DataMessageSend {
            content: Some("hi".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"content":"hi"}"#);
    }

    #[test]
    fn gateway_message_tolerates_unknown_fields() {
        let raw = r#"{
            "_id": "01J0000000000000000000000A",
            "channel": "01J0000000000000000000000B",
            "author": "01J0000000000000000000000C",
            "content": "!candy",
            "attachments": [],
            "system": null
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.content.as_deref(), Some("!candy"));
        assert!(!msg.is_system());
        assert!(msg.webhook.is_none());
    }
}
