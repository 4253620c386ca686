mod client;

pub use client::parse_json_if_ok;
pub use client::{AuthToken, RevoltClient};
pub(crate) use client::{normalize_proxy, WsSink, DEFAULT_WS_URL};

pub use crate::{
    api::{messages::MessagesApi, servers::ServersApi, users::UsersApi},
    error::RevoltError,
};
