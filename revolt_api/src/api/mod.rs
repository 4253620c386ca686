pub mod messages;
pub mod servers;
pub mod users;
