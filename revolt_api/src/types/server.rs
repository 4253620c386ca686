use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The subset of a server object needed to evaluate member permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub default_permissions: u64,
    #[serde(default)]
    pub roles: HashMap<String, Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub permissions: OverrideField,
    /// Lower rank means higher priority.
    #[serde(default)]
    pub rank: i64,
}

/// Allow / deny bit pair as sent on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideField {
    pub a: u64,
    pub d: u64,
}

/// Any channel. Only the fields the bot routes on are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "_id")]
    pub id: String,
    pub channel_type: String,
    pub server: Option<String>,
    pub name: Option<String>,
}
