//! The economy aggregate: every account, every cooldown, and the
//! leaderboard's last-posted date. This is the unit of persistence.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Actions gated by a per-user cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// First qualifying post of the day.
    Daily,
    /// The trick-or-treat gamble.
    Trick,
    /// The random bonus found while chatting.
    RandomBonus,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Trick => "trick",
            Self::RandomBonus => "random_bonus",
        }
    }
}

/// One user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: u64,
    /// Creation sequence number; earlier accounts rank first on ties.
    #[serde(default)]
    pub opened: u64,
}

/// Last-triggered time per action for one user.
pub type CooldownMap = BTreeMap<Action, DateTime<Utc>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardState {
    /// Local calendar date of the last scheduled post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_posted: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyState {
    #[serde(default)]
    pub(crate) accounts: BTreeMap<String, Account>,
    #[serde(default)]
    pub(crate) cooldowns: BTreeMap<String, CooldownMap>,
    #[serde(default)]
    pub leaderboard: LeaderboardState,
    #[serde(default)]
    pub(crate) next_opened: u64,
}

impl EconomyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.cooldowns.is_empty()
    }

    /// Every account, keyed by user ID.
    pub fn accounts(&self) -> impl Iterator<Item = (&str, &Account)> {
        self.accounts.iter().map(|(id, acc)| (id.as_str(), acc))
    }

    pub fn account(&self, user_id: &str) -> Option<&Account> {
        self.accounts.get(user_id)
    }

    pub fn cooldowns_for(&self, user_id: &str) -> Option<&CooldownMap> {
        self.cooldowns.get(user_id)
    }

    /// Fetch an account, opening it with a zero balance if absent.
    pub(crate) fn account_mut(&mut self, user_id: &str) -> &mut Account {
        let next = &mut self.next_opened;
        self.accounts.entry(user_id.to_string()).or_insert_with(|| {
            let opened = *next;
            *next = next.saturating_add(1);
            Account { balance: 0, opened }
        })
    }

    /// Insert an account verbatim, keeping the creation sequence ahead of
    /// every stored account. Used when migrating older documents.
    pub(crate) fn restore_account(&mut self, user_id: String, account: Account) {
        self.next_opened = self.next_opened.max(account.opened.saturating_add(1));
        self.accounts.insert(user_id, account);
    }
}
