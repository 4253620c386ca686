use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Events the client sends to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum ClientToServerEvent {
    Authenticate { token: String },
    Ping { data: i64 },
}

/// Events the gateway sends to the client. Anything the bot does not act on
/// lands in [`ServerToClientEvent::Unhandled`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum ServerToClientEvent {
    Error {
        error: String,
    },
    Authenticated,
    Logout,
    Bulk {
        v: Vec<ServerToClientEvent>,
    },
    Pong {
        data: i64,
    },
    Ready {
        #[serde(default)]
        users: Vec<Value>,
        #[serde(default)]
        servers: Vec<Value>,
        #[serde(default)]
        channels: Vec<Value>,
    },
    Message {
        #[serde(rename = "_id")]
        id: String,
        channel: String,
        author: String,
        content: Option<String>,
        #[serde(flatten)]
        extra: Value,
    },
    #[serde(other)]
    Unhandled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_types_are_tolerated() {
        let evt: ServerToClientEvent =
            serde_json::from_str(r#"{"type":"ChannelStartTyping","id":"a","user":"b"}"#).unwrap();
        assert!(matches!(evt, ServerToClientEvent::Unhandled));
    }

    #[test]
    fn bulk_nests_events() {
        let evt: ServerToClientEvent = serde_json::from_str(
            r#"{"type":"Bulk","v":[{"type":"Authenticated"},{"type":"Pong","data":3}]}"#,
        )
        .unwrap();
        let ServerToClientEvent::Bulk { v } = evt else {
            panic!("expected bulk");
        };
        assert_eq!(v.len(), 2);
        assert!(matches!(v[1], ServerToClientEvent::Pong { data: 3 }));
    }

    #[test]
    fn authenticate_serializes_with_tag() {
        let json = serde_json::to_string(&ClientToServerEvent::Authenticate {
            token: "t".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"Authenticate","token":"t"}"#);
    }
}
