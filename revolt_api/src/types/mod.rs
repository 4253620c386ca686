pub mod error_types;
pub mod message;
pub mod server;
pub mod user;
pub mod websocket;

pub use error_types::Error as ApiError;
pub use message::{DataMessageSend, Message, SendableEmbed};
pub use server::{Channel, OverrideField, Role, Server};
pub use user::{Member, User};
pub use websocket::*;
