use async_trait::async_trait;

use crate::{
    client::{parse_json_if_ok, RevoltClient},
    error::RevoltError,
    types::user::User,
    util::build_url,
};

#[async_trait]
pub trait UsersApi {
    /// Fetch a user by ID.
    async fn fetch_user(&self, user_id: &str) -> Result<User, RevoltError>;
}

#[async_trait]
impl UsersApi for RevoltClient {
    async fn fetch_user(&self, user_id: &str) -> Result<User, RevoltError> {
        let url = build_url(&self.base_url, &["users", user_id]);
        let resp = self.authed_get(&url).await?;
        parse_json_if_ok(resp).await
    }
}
