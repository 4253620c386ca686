//! The economy service: owns the state, applies reward decisions and writes
//! every change through to the store.

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    rewards::{GambleResult, GambleRoll, QualifyingChannels, RewardEvent, RewardPolicy},
    scheduler::DailyTrigger,
    state::{Action, EconomyState},
    store::Store,
};

pub struct Economy {
    state: EconomyState,
    store: Store,
    policy: RewardPolicy,
    qualifying: QualifyingChannels,
}

impl Economy {
    /// Load the economy from `store`; see [`Store::load`] for fallbacks.
    pub fn open(store: Store, policy: RewardPolicy, qualifying: QualifyingChannels) -> Self {
        let state = store.load();
        Self::new(state, store, policy, qualifying)
    }

    pub fn new(
        state: EconomyState,
        store: Store,
        policy: RewardPolicy,
        qualifying: QualifyingChannels,
    ) -> Self {
        Self {
            state,
            store,
            policy,
            qualifying,
        }
    }

    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    pub fn balance(&self, user_id: &str) -> u64 {
        self.state.balance(user_id)
    }

    /// Apply `delta` and persist.
    pub fn adjust(&mut self, user_id: &str, delta: i64) -> u64 {
        let balance = self.state.adjust(user_id, delta);
        self.flush();
        balance
    }

    /// Passive rewards for a post in `channel_id`. Both bonuses may fire on
    /// the same post.
    pub fn on_post<R: Rng + ?Sized>(
        &mut self,
        user_id: &str,
        channel_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<RewardEvent> {
        if !self.qualifying.qualifies(channel_id) {
            return Vec::new();
        }
        self.claim_daily(user_id, now)
            .into_iter()
            .chain(self.roll_random_bonus(user_id, now, rng))
            .collect()
    }

    pub fn claim_daily(&mut self, user_id: &str, now: DateTime<Utc>) -> Option<RewardEvent> {
        let window = self.policy.daily_window();
        if self.state.time_remaining(user_id, Action::Daily, window, now).is_some() {
            return None;
        }

        let amount = self.policy.daily.amount;
        let balance = self.state.adjust(user_id, to_delta(amount));
        self.state.mark_triggered(user_id, Action::Daily, now);
        self.flush();

        info!(user_id, amount, balance, "daily bonus granted");
        Some(RewardEvent::DailyBonus {
            user_id: user_id.to_string(),
            amount,
            balance,
        })
    }

    pub fn roll_random_bonus<R: Rng + ?Sized>(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Option<RewardEvent> {
        let window = self.policy.random_window();
        if let Some(window) = window {
            if self
                .state
                .time_remaining(user_id, Action::RandomBonus, window, now)
                .is_some()
            {
                return None;
            }
        }
        if !self.policy.random.roll(rng) {
            return None;
        }

        let amount = self.policy.random.amount;
        let balance = self.state.adjust(user_id, to_delta(amount));
        if window.is_some() {
            self.state.mark_triggered(user_id, Action::RandomBonus, now);
        }
        self.flush();

        info!(user_id, amount, balance, "random bonus found");
        Some(RewardEvent::RandomBonus {
            user_id: user_id.to_string(),
            amount,
            balance,
        })
    }

    /// Trick-or-treat with a freshly rolled outcome.
    pub fn trick_or_treat<R: Rng + ?Sized>(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> GambleResult {
        let window = self.policy.gamble_window();
        if let Some(remaining) = self.state.time_remaining(user_id, Action::Trick, window, now) {
            return GambleResult::Denied { remaining };
        }
        let roll = self.policy.gamble.roll(rng);
        self.trick_or_treat_with(user_id, now, roll)
    }

    /// Trick-or-treat with a predetermined outcome. The cooldown is marked
    /// before the balance moves, whatever the outcome.
    pub fn trick_or_treat_with(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
        roll: GambleRoll,
    ) -> GambleResult {
        let window = self.policy.gamble_window();
        if let Some(remaining) = self.state.time_remaining(user_id, Action::Trick, window, now) {
            return GambleResult::Denied { remaining };
        }
        self.state.mark_triggered(user_id, Action::Trick, now);

        let event = match roll {
            GambleRoll::Win(amount) => {
                let balance = self.state.adjust(user_id, to_delta(amount));
                RewardEvent::GambleWon {
                    user_id: user_id.to_string(),
                    amount,
                    balance,
                }
            }
            GambleRoll::Lose(penalty) => {
                let amount = penalty.min(self.state.balance(user_id));
                let balance = self.state.adjust(user_id, -to_delta(amount));
                RewardEvent::GambleLost {
                    user_id: user_id.to_string(),
                    amount,
                    balance,
                }
            }
        };
        self.flush();

        info!(user_id, ?roll, balance = event.balance(), "trick-or-treat resolved");
        GambleResult::Resolved(event)
    }

    /// Moderator balance change; no cooldowns involved.
    pub fn moderator_adjust(&mut self, user_id: &str, delta: i64) -> u64 {
        let balance = self.adjust(user_id, delta);
        info!(user_id, delta, balance, "moderator adjustment");
        balance
    }

    /// Reserve today's scheduled leaderboard post. Returns `true` at most once
    /// per local calendar day, and only inside the trigger window.
    pub fn claim_leaderboard_slot(&mut self, trigger: &DailyTrigger, now_local: NaiveDateTime) -> bool {
        let Some(slot) = trigger.due_slot(now_local, self.state.leaderboard.last_posted) else {
            return false;
        };
        self.state.leaderboard.last_posted = Some(slot);
        self.flush();
        debug!(date = %slot, "leaderboard slot claimed");
        true
    }

    /// Persist the current state. Failures are logged and the in-memory
    /// state keeps serving.
    pub fn flush(&self) {
        if let Err(error) = self.store.save(&self.state) {
            warn!(path = %self.store.path().display(), %error, "failed to persist economy");
        }
    }
}

fn to_delta(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, TimeDelta, TimeZone};
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn economy(dir: &tempfile::TempDir, policy: RewardPolicy) -> Economy {
        Economy::open(
            Store::new(dir.path().join("candy.json")),
            policy,
            QualifyingChannels::excluding(["gamble".to_string()]),
        )
    }

    fn no_random() -> RewardPolicy {
        let mut policy = RewardPolicy::default();
        policy.random.probability = 0.0;
        policy
    }

    #[test]
    fn daily_bonus_once_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, no_random());
        let mut rng = StdRng::seed_from_u64(1);

        let first = eco.on_post("u", "general", t0(), &mut rng);
        assert_eq!(
            first,
            vec![RewardEvent::DailyBonus {
                user_id: "u".into(),
                amount: 1,
                balance: 1
            }]
        );
        assert!(eco
            .on_post("u", "general", t0() + TimeDelta::minutes(1), &mut rng)
            .is_empty());
        assert_eq!(eco.balance("u"), 1);

        eco.on_post("u", "general", t0() + TimeDelta::hours(25), &mut rng);
        assert_eq!(eco.balance("u"), 2);
    }

    #[test]
    fn excluded_channel_earns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, RewardPolicy::default());
        let mut rng = StdRng::seed_from_u64(2);
        assert!(eco.on_post("u", "gamble", t0(), &mut rng).is_empty());
        assert!(eco.state().account("u").is_none());
    }

    #[test]
    fn random_bonus_respects_probability_and_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let mut policy = RewardPolicy::default();
        policy.random.probability = 1.0;
        let mut eco = economy(&dir, policy);
        let mut rng = StdRng::seed_from_u64(3);

        let events = eco.on_post("u", "general", t0(), &mut rng);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], RewardEvent::RandomBonus { balance: 2, .. }));

        assert!(eco
            .roll_random_bonus("u", t0() + TimeDelta::minutes(30), &mut rng)
            .is_none());
        assert!(eco
            .roll_random_bonus("u", t0() + TimeDelta::minutes(60), &mut rng)
            .is_some());
    }

    #[test]
    fn random_bonus_without_cooldown_is_not_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let mut policy = RewardPolicy::default();
        policy.random.probability = 1.0;
        policy.random.cooldown_secs = None;
        let mut eco = economy(&dir, policy);
        let mut rng = StdRng::seed_from_u64(4);

        for _ in 0..3 {
            assert!(eco.roll_random_bonus("u", t0(), &mut rng).is_some());
        }
        assert_eq!(eco.balance("u"), 3);
        assert!(eco.state().last_triggered("u", Action::RandomBonus).is_none());
    }

    #[test]
    fn failed_random_roll_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, no_random());
        let mut rng = StdRng::seed_from_u64(5);
        assert!(eco.roll_random_bonus("u", t0(), &mut rng).is_none());
        assert!(eco.state().is_empty());
    }

    #[test]
    fn second_gamble_is_denied_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, RewardPolicy::default());
        eco.trick_or_treat_with("u", t0(), GambleRoll::Win(4));
        assert_eq!(eco.balance("u"), 4);

        let later = t0() + TimeDelta::hours(2);
        let mut rng = StdRng::seed_from_u64(6);
        match eco.trick_or_treat("u", later, &mut rng) {
            GambleResult::Denied { remaining } => {
                assert_eq!(remaining, TimeDelta::hours(22));
            }
            other => panic!("expected denial, got {other:?}"),
        }
        assert_eq!(eco.balance("u"), 4);
    }

    #[test]
    fn forced_win_adds_the_roll() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, RewardPolicy::default());
        eco.adjust("u", 10);
        let result = eco.trick_or_treat_with("u", t0(), GambleRoll::Win(5));
        assert_eq!(
            result,
            GambleResult::Resolved(RewardEvent::GambleWon {
                user_id: "u".into(),
                amount: 5,
                balance: 15
            })
        );
    }

    #[test]
    fn forced_loss_is_capped_at_balance() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, RewardPolicy::default());
        eco.adjust("u", 2);
        let result = eco.trick_or_treat_with("u", t0(), GambleRoll::Lose(3));
        assert_eq!(
            result,
            GambleResult::Resolved(RewardEvent::GambleLost {
                user_id: "u".into(),
                amount: 2,
                balance: 0
            })
        );
        assert!(eco.state().last_triggered("u", Action::Trick).is_some());
    }

    #[test]
    fn seeded_gamble_stays_in_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, RewardPolicy::default());
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for day in 0..50 {
            let now = t0() + TimeDelta::days(day);
            let before = eco.balance("u");
            match eco.trick_or_treat("u", now, &mut rng) {
                GambleResult::Resolved(RewardEvent::GambleWon { amount, balance, .. }) => {
                    assert!((1..=5).contains(&amount));
                    assert_eq!(balance, before + amount);
                }
                GambleResult::Resolved(RewardEvent::GambleLost { amount, balance, .. }) => {
                    assert!(amount <= before);
                    assert_eq!(balance, before - amount);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn moderator_adjust_ignores_cooldowns() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, RewardPolicy::default());
        assert_eq!(eco.moderator_adjust("u", 7), 7);
        assert_eq!(eco.moderator_adjust("u", -10), 0);
        assert!(eco.state().cooldowns_for("u").is_none());
    }

    #[test]
    fn unwritable_store_keeps_serving_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let store = Store::new(blocker.join("candy.json"));
        assert!(store.save(&EconomyState::new()).is_err());

        let mut eco = Economy::open(
            store,
            no_random(),
            QualifyingChannels::excluding(["gamble".to_string()]),
        );
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(eco.adjust("u", 4), 4);
        assert_eq!(eco.on_post("u", "general", t0(), &mut rng).len(), 1);
        assert_eq!(eco.balance("u"), 5);
        assert!(eco.state().last_triggered("u", Action::Daily).is_some());
    }

    #[test]
    fn every_change_is_written_through() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut eco = economy(&dir, no_random());
            let mut rng = StdRng::seed_from_u64(8);
            eco.on_post("u", "general", t0(), &mut rng);
            eco.trick_or_treat_with("u", t0(), GambleRoll::Win(3));
        }
        let reopened = economy(&dir, no_random());
        assert_eq!(reopened.balance("u"), 4);
        assert!(reopened
            .state()
            .time_remaining("u", Action::Trick, TimeDelta::hours(24), t0() + TimeDelta::hours(1))
            .is_some());
    }

    #[test]
    fn leaderboard_slot_is_claimed_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut eco = economy(&dir, RewardPolicy::default());
        let trigger = DailyTrigger::new(
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            TimeDelta::minutes(5),
        );
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let at = |h, m| day.and_hms_opt(h, m, 0).unwrap();

        assert!(!eco.claim_leaderboard_slot(&trigger, at(16, 59)));
        assert!(eco.claim_leaderboard_slot(&trigger, at(17, 1)));
        assert!(!eco.claim_leaderboard_slot(&trigger, at(17, 2)));

        let reopened = economy(&dir, RewardPolicy::default());
        assert_eq!(reopened.state().leaderboard.last_posted, Some(day));
    }
}
