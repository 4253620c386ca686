//! # Candy bot
//!
//! A Revolt bot that runs a small candy economy for a community: a daily
//! bonus for the first post of the day, a chance of finding candy while
//! chatting, a once-a-day trick-or-treat gamble, moderator adjustments and a
//! daily leaderboard.
//!
//! The economy core ([`state`], [`ledger`], [`cooldown`], [`rewards`],
//! [`economy`], [`store`], [`leaderboard`], [`scheduler`]) has no network
//! dependencies. [`bot`] drives it from chat messages through the
//! [`platform::Platform`] seam, and [`handler`] connects that to the
//! `revolt_api` gateway.

pub mod bot;
pub mod commands;
pub mod config;
pub mod cooldown;
pub mod economy;
pub mod error;
pub mod handler;
pub mod leaderboard;
pub mod ledger;
pub mod platform;
pub mod rewards;
pub mod scheduler;
pub mod state;
pub mod store;

pub use bot::{CandyBot, Incoming};
pub use config::BotConfig;
pub use economy::Economy;
pub use store::Store;
