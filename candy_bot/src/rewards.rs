//! Reward policy and pure reward decisions.
//!
//! Nothing here touches storage. [`crate::economy::Economy`] applies these
//! decisions to the state and persists them.

use chrono::TimeDelta;
use rand::Rng;
use serde::Deserialize;

use crate::error::ConfigError;

/// Every tunable of the three reward kinds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    pub daily: DailyPolicy,
    pub random: RandomPolicy,
    pub gamble: GamblePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DailyPolicy {
    pub amount: u64,
    pub cooldown_secs: u64,
}

impl Default for DailyPolicy {
    fn default() -> Self {
        Self {
            amount: 1,
            cooldown_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RandomPolicy {
    pub probability: f64,
    pub amount: u64,
    /// `None` rolls on every qualifying post.
    pub cooldown_secs: Option<u64>,
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self {
            probability: 0.1,
            amount: 1,
            cooldown_secs: Some(60 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GamblePolicy {
    pub win_probability: f64,
    pub win_min: u64,
    pub win_max: u64,
    pub loss_min: u64,
    pub loss_max: u64,
    pub cooldown_secs: u64,
}

impl Default for GamblePolicy {
    fn default() -> Self {
        Self {
            win_probability: 0.7,
            win_min: 1,
            win_max: 5,
            loss_min: 1,
            loss_max: 3,
            cooldown_secs: 24 * 60 * 60,
        }
    }
}

impl RewardPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("rewards.random.probability", self.random.probability)?;
        check_probability("rewards.gamble.win_probability", self.gamble.win_probability)?;

        let g = &self.gamble;
        if g.win_min > g.win_max {
            return Err(ConfigError::Invalid(format!(
                "rewards.gamble: win_min ({}) exceeds win_max ({})",
                g.win_min, g.win_max
            )));
        }
        if g.loss_min > g.loss_max {
            return Err(ConfigError::Invalid(format!(
                "rewards.gamble: loss_min ({}) exceeds loss_max ({})",
                g.loss_min, g.loss_max
            )));
        }
        for (field, value) in [
            ("rewards.daily.amount", self.daily.amount),
            ("rewards.random.amount", self.random.amount),
            ("rewards.gamble.win_max", g.win_max),
            ("rewards.gamble.loss_max", g.loss_max),
        ] {
            if i64::try_from(value).is_err() {
                return Err(ConfigError::Invalid(format!("{field} is too large")));
            }
        }
        for (field, secs) in [
            ("rewards.daily.cooldown_secs", Some(self.daily.cooldown_secs)),
            ("rewards.random.cooldown_secs", self.random.cooldown_secs),
            ("rewards.gamble.cooldown_secs", Some(g.cooldown_secs)),
        ] {
            if secs.is_some_and(|s| window(s).is_none()) {
                return Err(ConfigError::Invalid(format!("{field} is out of range")));
            }
        }
        Ok(())
    }

    pub fn daily_window(&self) -> TimeDelta {
        window(self.daily.cooldown_secs).unwrap_or(TimeDelta::MAX)
    }

    pub fn random_window(&self) -> Option<TimeDelta> {
        self.random
            .cooldown_secs
            .map(|s| window(s).unwrap_or(TimeDelta::MAX))
    }

    pub fn gamble_window(&self) -> TimeDelta {
        window(self.gamble.cooldown_secs).unwrap_or(TimeDelta::MAX)
    }
}

fn window(secs: u64) -> Option<TimeDelta> {
    i64::try_from(secs).ok().and_then(TimeDelta::try_seconds)
}

fn check_probability(field: &str, p: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be between 0 and 1, got {p}"
        )))
    }
}

/// Raw outcome of the gamble coin flip, before clamping to the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GambleRoll {
    Win(u64),
    Lose(u64),
}

impl GamblePolicy {
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> GambleRoll {
        if rng.random_bool(self.win_probability) {
            GambleRoll::Win(rng.random_range(self.win_min..=self.win_max))
        } else {
            GambleRoll::Lose(rng.random_range(self.loss_min..=self.loss_max))
        }
    }
}

impl RandomPolicy {
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.random_bool(self.probability)
    }
}

/// Something that changed a balance and is worth announcing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardEvent {
    DailyBonus {
        user_id: String,
        amount: u64,
        balance: u64,
    },
    RandomBonus {
        user_id: String,
        amount: u64,
        balance: u64,
    },
    GambleWon {
        user_id: String,
        amount: u64,
        balance: u64,
    },
    /// `amount` is what was actually taken, never more than the balance held.
    GambleLost {
        user_id: String,
        amount: u64,
        balance: u64,
    },
}

impl RewardEvent {
    pub fn balance(&self) -> u64 {
        match self {
            Self::DailyBonus { balance, .. }
            | Self::RandomBonus { balance, .. }
            | Self::GambleWon { balance, .. }
            | Self::GambleLost { balance, .. } => *balance,
        }
    }
}

/// Result of a trick-or-treat attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GambleResult {
    Denied { remaining: TimeDelta },
    Resolved(RewardEvent),
}

/// Which channels count toward passive rewards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifyingChannels {
    excluded: Vec<String>,
}

impl QualifyingChannels {
    pub fn excluding(excluded: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
        }
    }

    pub fn qualifies(&self, channel_id: &str) -> bool {
        !self.excluded.iter().any(|c| c == channel_id)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn defaults_match_the_classic_game() {
        let p = RewardPolicy::default();
        assert_eq!(p.daily.amount, 1);
        assert_eq!(p.daily_window(), TimeDelta::hours(24));
        assert_eq!(p.random_window(), Some(TimeDelta::hours(1)));
        assert_eq!(p.gamble_window(), TimeDelta::hours(24));
        assert_eq!(p.gamble.win_probability, 0.7);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let p: RewardPolicy =
            serde_json::from_str(r#"{ "random": { "cooldown_secs": null }, "gamble": { "win_max": 9 } }"#)
                .unwrap();
        assert_eq!(p.random_window(), None);
        assert_eq!(p.random.probability, 0.1);
        assert_eq!(p.gamble.win_max, 9);
        assert_eq!(p.gamble.win_min, 1);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut p = RewardPolicy::default();
        p.gamble.win_probability = 1.5;
        assert!(matches!(p.validate(), Err(ConfigError::Invalid(_))));

        let mut p = RewardPolicy::default();
        p.gamble.loss_min = 4;
        assert!(p.validate().is_err());

        let mut p = RewardPolicy::default();
        p.random.probability = f64::NAN;
        assert!(p.validate().is_err());

        let mut p = RewardPolicy::default();
        p.daily.amount = u64::MAX;
        assert!(p.validate().is_err());
    }

    #[test]
    fn gamble_rolls_stay_in_range() {
        let policy = GamblePolicy::default();
        let mut rng = StdRng::seed_from_u64(31);
        let (mut wins, mut losses) = (0, 0);
        for _ in 0..1_000 {
            match policy.roll(&mut rng) {
                GambleRoll::Win(n) => {
                    assert!((1..=5).contains(&n));
                    wins += 1;
                }
                GambleRoll::Lose(n) => {
                    assert!((1..=3).contains(&n));
                    losses += 1;
                }
            }
        }
        assert!(wins > losses);
    }

    #[test]
    fn certain_probabilities_are_certain() {
        let mut rng = StdRng::seed_from_u64(7);
        let always = GamblePolicy {
            win_probability: 1.0,
            ..GamblePolicy::default()
        };
        let never = RandomPolicy {
            probability: 0.0,
            ..RandomPolicy::default()
        };
        for _ in 0..100 {
            assert!(matches!(always.roll(&mut rng), GambleRoll::Win(_)));
            assert!(!never.roll(&mut rng));
        }
    }

    #[test]
    fn excluded_channels_do_not_qualify() {
        let q = QualifyingChannels::excluding(["gamble".to_string()]);
        assert!(!q.qualifies("gamble"));
        assert!(q.qualifies("general"));
        assert!(QualifyingChannels::excluding(Vec::new()).qualifies("gamble"));
    }
}
