//! Message handling: filtering, passive rewards, command dispatch and
//! publishing. Everything that touches the network goes through
//! [`Platform`], so this module runs unchanged against a test double.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use revolt_api::{util::mention, Message};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    commands::{Command, CommandKind, CommandParser},
    config::BotConfig,
    cooldown::format_wait,
    economy::Economy,
    error::{CommandError, ConfigError},
    leaderboard::{self, Page, Style},
    platform::Platform,
    rewards::{GambleResult, RewardEvent},
    scheduler::DailyTrigger,
};

/// The parts of an inbound message the bot acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub channel: String,
    pub author: String,
    pub content: Option<String>,
    pub from_webhook: bool,
    pub is_system: bool,
}

impl From<&Message> for Incoming {
    fn from(msg: &Message) -> Self {
        Self {
            channel: msg.channel.clone(),
            author: msg.author.clone(),
            content: msg.content.clone(),
            from_webhook: msg.webhook.is_some(),
            is_system: msg.is_system(),
        }
    }
}

pub struct CandyBot<P: Platform> {
    config: BotConfig,
    parser: CommandParser,
    trigger: DailyTrigger,
    style: Style,
    economy: Arc<Mutex<Economy>>,
    rng: Mutex<StdRng>,
    platform: P,
}

impl<P: Platform> CandyBot<P> {
    pub fn new(
        config: BotConfig,
        economy: Economy,
        platform: P,
        rng: StdRng,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            parser: CommandParser::new(config.command_prefix.clone())?,
            trigger: config.trigger()?,
            style: config.leaderboard_style(),
            config,
            economy: Arc::new(Mutex::new(economy)),
            rng: Mutex::new(rng),
            platform,
        })
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn economy(&self) -> Arc<Mutex<Economy>> {
        Arc::clone(&self.economy)
    }

    pub fn trigger(&self) -> DailyTrigger {
        self.trigger
    }

    pub async fn handle_message(&self, msg: &Incoming, now: DateTime<Utc>) {
        if msg.from_webhook || msg.is_system || self.platform.is_automated(&msg.author).await {
            return;
        }

        let events = {
            let mut economy = self.economy.lock().await;
            let mut rng = self.rng.lock().await;
            economy.on_post(&msg.author, &msg.channel, now, &mut *rng)
        };
        for event in &events {
            let text = self.describe(event);
            self.publish(self.config.announce_channel(), &text).await;
        }

        let Some(content) = msg.content.as_deref() else {
            return;
        };
        if let Some(parsed) = self.parser.parse(content) {
            debug!(command = parsed.kind.name(), author = %msg.author, "command received");
            self.dispatch(msg, parsed.kind, parsed.command, now).await;
        }
    }

    async fn dispatch(
        &self,
        msg: &Incoming,
        kind: CommandKind,
        command: Result<Command, CommandError>,
        now: DateTime<Utc>,
    ) {
        match kind {
            CommandKind::Balance => {}
            CommandKind::TrickOrTreat => {
                if msg.channel != self.config.channels.gamble {
                    return;
                }
            }
            CommandKind::AddCandy | CommandKind::RemoveCandy => {
                if msg.channel != self.config.channels.moderation {
                    return;
                }
                if !self.require_moderator(msg).await {
                    return;
                }
            }
            CommandKind::ForceLeaderboard => {
                if !self.require_moderator(msg).await {
                    return;
                }
            }
        }

        let command = match command {
            Ok(command) => command,
            Err(e) => {
                let usage = format!("Usage: `{}` ({e})", self.parser.usage(kind));
                self.publish(&msg.channel, &usage).await;
                return;
            }
        };

        match command {
            Command::Balance => {
                let balance = self.economy.lock().await.balance(&msg.author);
                let text = format!(
                    "{} {} has {} {}.",
                    self.config.currency.emoji,
                    mention(&msg.author),
                    balance,
                    self.config.currency.name
                );
                self.publish(&msg.channel, &text).await;
            }
            Command::TrickOrTreat => self.trick_or_treat(msg, now).await,
            Command::AddCandy { target, amount } => {
                self.moderator_adjust(msg, &target, amount, false).await;
            }
            Command::RemoveCandy { target, amount } => {
                self.moderator_adjust(msg, &target, amount, true).await;
            }
            Command::ForceLeaderboard => {
                info!(author = %msg.author, "leaderboard forced");
                self.post_leaderboard(&msg.channel).await;
            }
        }
    }

    async fn require_moderator(&self, msg: &Incoming) -> bool {
        if self.platform.is_moderator(&msg.channel, &msg.author).await {
            return true;
        }
        self.publish(&msg.channel, "❌ You don't have permission to use this command.")
            .await;
        false
    }

    async fn trick_or_treat(&self, msg: &Incoming, now: DateTime<Utc>) {
        let result = {
            let mut economy = self.economy.lock().await;
            let mut rng = self.rng.lock().await;
            economy.trick_or_treat(&msg.author, now, &mut *rng)
        };
        let text = match result {
            GambleResult::Denied { remaining } => format!(
                "⏳ You must wait {} before trick-or-treating again.",
                format_wait(remaining)
            ),
            GambleResult::Resolved(event) => self.describe(&event),
        };
        self.publish(&msg.channel, &text).await;
    }

    async fn moderator_adjust(
        &self,
        msg: &Incoming,
        target: &str,
        amount: i64,
        remove: bool,
    ) {
        if !self.platform.is_member(&msg.channel, target).await {
            let text = format!("❌ {} is not a member of this server.", mention(target));
            self.publish(&msg.channel, &text).await;
            return;
        }

        let delta = if remove {
            amount.checked_neg().unwrap_or(i64::MAX)
        } else {
            amount
        };
        let (before, balance) = {
            let mut economy = self.economy.lock().await;
            let before = economy.balance(target);
            (before, economy.moderator_adjust(target, delta))
        };
        // Balances clamp at zero, so report what actually moved.
        let moved = before.abs_diff(balance);
        let (verb, preposition) = if delta < 0 {
            ("Removed", "from")
        } else {
            ("Added", "to")
        };
        let text = format!(
            "✅ {verb} {moved} {} {preposition} {}. They now have {balance}.",
            self.config.currency.name,
            mention(target),
        );
        self.publish(&msg.channel, &text).await;
    }

    /// Scheduled leaderboard post; a no-op outside the trigger window or
    /// when today's post already went out.
    pub async fn run_scheduled(&self, now_local: NaiveDateTime) {
        let claimed = self
            .economy
            .lock()
            .await
            .claim_leaderboard_slot(&self.trigger, now_local);
        if claimed {
            info!(channel = %self.config.channels.leaderboard, "posting daily leaderboard");
            self.post_leaderboard(&self.config.channels.leaderboard).await;
        }
    }

    async fn post_leaderboard(&self, channel_id: &str) {
        let pages: Vec<Page> = {
            let economy = self.economy.lock().await;
            leaderboard::render(economy.state(), &self.style)
        };
        if let Err(e) = self.platform.send_pages(channel_id, &pages).await {
            error!(channel_id, error = %e, "failed to publish leaderboard");
        }
    }

    fn describe(&self, event: &RewardEvent) -> String {
        let currency = &self.config.currency;
        match event {
            RewardEvent::DailyBonus { user_id, amount, .. } => format!(
                "🎃 {} earned {amount} {} for being active today!",
                mention(user_id),
                currency.name
            ),
            RewardEvent::RandomBonus { user_id, amount, .. } => format!(
                "✨ {} stumbled upon a hidden {}! (+{amount})",
                mention(user_id),
                currency.name
            ),
            RewardEvent::GambleWon { user_id, amount, .. } => format!(
                "{} {} found {amount} {}!",
                currency.emoji,
                mention(user_id),
                currency.name
            ),
            RewardEvent::GambleLost { user_id, amount, .. } => format!(
                "👻 A ghost scared {}! They dropped {amount} {}...",
                mention(user_id),
                currency.name
            ),
        }
    }

    async fn publish(&self, channel_id: &str, content: &str) {
        if let Err(e) = self.platform.send_text(channel_id, content).await {
            error!(channel_id, error = %e, "failed to send message");
        }
    }
}
