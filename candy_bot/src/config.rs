//! JSON configuration for the bot.

use std::{fs, path::Path};

use chrono::{NaiveTime, TimeDelta};
use revolt_api::Permission;
use serde::Deserialize;

use crate::{
    error::ConfigError,
    leaderboard::Style,
    rewards::{QualifyingChannels, RewardPolicy},
    scheduler::DailyTrigger,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Where `!trickortreat` works. Excluded from passive rewards by default.
    pub gamble: String,
    /// Where the daily leaderboard is posted.
    pub leaderboard: String,
    /// Where moderator commands are accepted.
    pub moderation: String,
    /// Where bonus announcements go; the gamble channel if unset.
    #[serde(default)]
    pub announce: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CurrencyConfig {
    pub name: String,
    pub emoji: String,
    pub leaderboard_emoji: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            name: "candy".into(),
            emoji: "🍬".into(),
            leaderboard_emoji: "🎃".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Local wall-clock time, `HH:MM`.
    pub post_at: String,
    pub catch_up_minutes: u32,
    pub page_size: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            post_at: "17:00".into(),
            catch_up_minutes: 5,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub channels: ChannelConfig,
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub rewards: RewardPolicy,
    /// Channels that never earn passive rewards. Unset means just the
    /// gamble channel.
    #[serde(default)]
    pub excluded_channels: Option<Vec<String>>,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default = "default_moderator_permission")]
    pub moderator_permission: Permission,
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub ws_url: Option<String>,
}

fn default_prefix() -> String {
    "!".into()
}

fn default_moderator_permission() -> Permission {
    Permission::ManageMessages
}

fn default_data_file() -> String {
    "candy.json".into()
}

fn default_api_url() -> String {
    "https://api.revolt.chat".into()
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let channels = [
            ("channels.gamble", Some(&self.channels.gamble)),
            ("channels.leaderboard", Some(&self.channels.leaderboard)),
            ("channels.moderation", Some(&self.channels.moderation)),
            ("channels.announce", self.channels.announce.as_ref()),
        ];
        for (field, value) in channels {
            if value.is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("'{field}' cannot be empty")));
            }
        }
        if self.command_prefix.trim().is_empty() || self.command_prefix.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(
                "'command_prefix' must be non-empty and contain no whitespace".into(),
            ));
        }
        if self.data_file.trim().is_empty() {
            return Err(ConfigError::Invalid("'data_file' cannot be empty".into()));
        }
        if self.leaderboard.page_size == 0 {
            return Err(ConfigError::Invalid("'leaderboard.page_size' must be at least 1".into()));
        }
        if !(1..24 * 60).contains(&self.leaderboard.catch_up_minutes) {
            return Err(ConfigError::Invalid(
                "'leaderboard.catch_up_minutes' must be between 1 and 1439".into(),
            ));
        }
        self.post_time()?;
        self.rewards.validate()
    }

    fn post_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.leaderboard.post_at, "%H:%M").map_err(|e| {
            ConfigError::Invalid(format!(
                "'leaderboard.post_at' must be HH:MM, got '{}': {e}",
                self.leaderboard.post_at
            ))
        })
    }

    pub fn announce_channel(&self) -> &str {
        self.channels
            .announce
            .as_deref()
            .unwrap_or(&self.channels.gamble)
    }

    pub fn qualifying_channels(&self) -> QualifyingChannels {
        match &self.excluded_channels {
            Some(excluded) => QualifyingChannels::excluding(excluded.iter().cloned()),
            None => QualifyingChannels::excluding([self.channels.gamble.clone()]),
        }
    }

    pub fn trigger(&self) -> Result<DailyTrigger, ConfigError> {
        Ok(DailyTrigger::new(
            self.post_time()?,
            TimeDelta::minutes(i64::from(self.leaderboard.catch_up_minutes)),
        ))
    }

    pub fn leaderboard_style(&self) -> Style {
        let c = &self.currency;
        let title = capitalize(&c.name);
        Style {
            title: format!("{0} {title} Leaderboard {0}", c.leaderboard_emoji),
            currency_name: c.name.clone(),
            emoji: c.emoji.clone(),
            page_size: self.leaderboard.page_size,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
