use async_trait::async_trait;

use crate::{
    client::{parse_json_if_ok, RevoltClient},
    error::RevoltError,
    types::{Channel, Member, Server},
    util::build_url,
};

/// Channel, server and member lookups used for permission checks.
#[async_trait]
pub trait ServersApi {
    async fn fetch_channel(&self, channel_id: &str) -> Result<Channel, RevoltError>;

    async fn fetch_server(&self, server_id: &str) -> Result<Server, RevoltError>;

    async fn fetch_member(&self, server_id: &str, user_id: &str) -> Result<Member, RevoltError>;
}

#[async_trait]
impl ServersApi for RevoltClient {
    async fn fetch_channel(&self, channel_id: &str) -> Result<Channel, RevoltError> {
        let url = build_url(&self.base_url, &["channels", channel_id]);
        parse_json_if_ok(self.authed_get(&url).await?).await
    }

    async fn fetch_server(&self, server_id: &str) -> Result<Server, RevoltError> {
        let url = build_url(&self.base_url, &["servers", server_id]);
        parse_json_if_ok(self.authed_get(&url).await?).await
    }

    async fn fetch_member(&self, server_id: &str, user_id: &str) -> Result<Member, RevoltError> {
        let url = build_url(&self.base_url, &["servers", server_id, "members", user_id]);
        parse_json_if_ok(self.authed_get(&url).await?).await
    }
}
