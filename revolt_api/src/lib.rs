//! # Revolt API
//!
//! Asynchronous Rust client for the parts of the Revolt API a community bot
//! needs: sending messages, resolving users, channels, servers and members,
//! and receiving events over the WebSocket gateway. Runs on `tokio`, speaks
//! HTTP through `reqwest`.

pub mod api;
pub mod client;
pub mod error;
pub mod permissions;
pub mod types;
pub mod util;
pub mod websocket;

pub use client::*;
pub use error::RevoltError;
pub use permissions::Permission;
pub use types::*;
pub use websocket::*;
