//! Per-user, per-action cooldown windows over [`EconomyState`].

use chrono::{DateTime, TimeDelta, Utc};

use crate::state::{Action, EconomyState};

impl EconomyState {
    /// Time left before `user_id` may perform `action` again, or `None` if
    /// they never have or the window has elapsed. A timestamp in the future
    /// (clock skew) counts as "just triggered".
    pub fn time_remaining(
        &self,
        user_id: &str,
        action: Action,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> Option<TimeDelta> {
        let last = *self.cooldowns.get(user_id)?.get(&action)?;
        let elapsed = (now - last).max(TimeDelta::zero());
        (elapsed < window).then(|| window - elapsed)
    }

    /// Record `now` as the last time `user_id` performed `action`.
    pub fn mark_triggered(&mut self, user_id: &str, action: Action, now: DateTime<Utc>) {
        self.cooldowns
            .entry(user_id.to_string())
            .or_default()
            .insert(action, now);
    }

    pub fn last_triggered(&self, user_id: &str, action: Action) -> Option<DateTime<Utc>> {
        self.cooldowns.get(user_id)?.get(&action).copied()
    }
}

/// `Hh Mm` as shown to users waiting out a cooldown.
pub fn format_wait(remaining: TimeDelta) -> String {
    let secs = remaining.num_seconds().max(0);
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}
