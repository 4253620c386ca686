pub mod event_handler;
pub mod gateway;
mod transport;

pub use event_handler::{EventHandler, ReadyEvent};
pub use gateway::ConnectionState;
