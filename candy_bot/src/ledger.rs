//! Balance bookkeeping over [`EconomyState`].
//!
//! Balances are unsigned and floor at zero: a debit larger than the balance
//! empties the account rather than failing.

use crate::state::EconomyState;

impl EconomyState {
    /// Current balance; unknown users have 0 and are not created.
    pub fn balance(&self, user_id: &str) -> u64 {
        self.accounts.get(user_id).map_or(0, |acc| acc.balance)
    }

    /// Apply `delta`, opening the account if needed, and return the new
    /// balance. The result is clamped to `0..=u64::MAX`.
    pub fn adjust(&mut self, user_id: &str, delta: i64) -> u64 {
        let account = self.account_mut(user_id);
        account.balance = apply_delta(account.balance, delta);
        account.balance
    }
}

fn apply_delta(balance: u64, delta: i64) -> u64 {
    if delta >= 0 {
        balance.saturating_add(delta.unsigned_abs())
    } else {
        balance.saturating_sub(delta.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    #[test]
    fn unknown_user_reads_zero_without_opening() {
        let state = EconomyState::new();
        assert_eq!(state.balance("nobody"), 0);
        assert!(state.account("nobody").is_none());
    }

    #[test]
    fn adjust_opens_and_accumulates() {
        let mut state = EconomyState::new();
        assert_eq!(state.adjust("a", 3), 3);
        assert_eq!(state.adjust("a", 2), 5);
        assert_eq!(state.adjust("a", -1), 4);
        assert_eq!(state.balance("a"), 4);
    }

    #[test]
    fn debit_clamps_at_zero() {
        let mut state = EconomyState::new();
        state.adjust("a", 2);
        assert_eq!(state.adjust("a", -10), 0);
        assert_eq!(state.adjust("b", -1), 0);
        assert!(state.account("b").is_some());
    }

    #[test]
    fn extremes_saturate() {
        let mut state = EconomyState::new();
        state.adjust("a", i64::MAX);
        state.adjust("a", i64::MAX);
        assert_eq!(state.adjust("a", i64::MAX), u64::MAX);
        assert_eq!(state.adjust("b", i64::MIN), 0);
    }

    #[test]
    fn random_walk_never_goes_negative() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let mut state = EconomyState::new();
        let mut shadow: i128 = 0;
        for _ in 0..2_000 {
            let delta = rng.random_range(-7..=5);
            shadow = (shadow + i128::from(delta)).max(0);
            let got = state.adjust("walker", delta);
            assert_eq!(i128::from(got), shadow);
        }
    }

    #[test]
    fn accounts_are_numbered_in_creation_order() {
        let mut state = EconomyState::new();
        state.adjust("zed", 1);
        state.adjust("amy", 1);
        state.adjust("zed", 1);
        assert_eq!(state.account("zed").unwrap().opened, 0);
        assert_eq!(state.account("amy").unwrap().opened, 1);
    }
}
