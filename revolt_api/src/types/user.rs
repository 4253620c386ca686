use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub discriminator: String,
    pub display_name: Option<String>,
    pub bot: Option<BotInformation>,
}

impl User {
    pub fn is_bot(&self) -> bool {
        self.bot.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotInformation {
    pub owner: String,
}

/// A server member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: MemberCompositeKey,
    pub joined_at: Option<String>,
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberCompositeKey {
    pub server: String,
    pub user: String,
}
