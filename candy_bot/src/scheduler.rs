//! Daily leaderboard trigger.
//!
//! The trigger fires once per local calendar day at a configured time. A
//! short catch-up window lets a process that comes up just after the trigger
//! time still post; a day missed entirely is skipped.

use std::future::Future;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use tracing::{debug, info};

/// Upper bound on one sleep, so wall-clock jumps are noticed.
const MAX_NAP_SECS: i64 = 10 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    at: NaiveTime,
    catch_up: TimeDelta,
}

impl DailyTrigger {
    pub fn new(at: NaiveTime, catch_up: TimeDelta) -> Self {
        Self { at, catch_up }
    }

    /// The calendar date of the window containing `now`, if any. A window
    /// opened late in the evening may run past midnight.
    pub fn window_containing(&self, now: NaiveDateTime) -> Option<NaiveDate> {
        let today = now.date();
        [Some(today), today.pred_opt()]
            .into_iter()
            .flatten()
            .find(|day| {
                let start = day.and_time(self.at);
                now >= start && now < start + self.catch_up
            })
    }

    /// Whether a post should go out at `now`, given the date of the last one.
    pub fn due_slot(&self, now: NaiveDateTime, last_posted: Option<NaiveDate>) -> Option<NaiveDate> {
        self.window_containing(now)
            .filter(|slot| last_posted.map_or(true, |last| last < *slot))
    }

    /// The first trigger time strictly after `now`.
    pub fn next_fire(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + TimeDelta::days(1)
        }
    }
}

/// Drive `fire` from the local wall clock forever. `fire` is invoked
/// whenever the clock is inside a trigger window; deciding whether the day's
/// post already went out is its job.
pub async fn run<F, Fut>(trigger: DailyTrigger, mut fire: F)
where
    F: FnMut(NaiveDateTime) -> Fut,
    Fut: Future<Output = ()>,
{
    info!(at = %trigger.at, "leaderboard scheduler started");
    loop {
        let now = Local::now().naive_local();
        if trigger.window_containing(now).is_some() {
            fire(now).await;
        }

        let now = Local::now().naive_local();
        let nap = match trigger.window_containing(now) {
            // Inside a window that was just handled: skip to its end.
            Some(day) => day.and_time(trigger.at) + trigger.catch_up - now,
            None => trigger.next_fire(now) - now,
        }
        .clamp(TimeDelta::seconds(1), TimeDelta::seconds(MAX_NAP_SECS));

        debug!(seconds = nap.num_seconds(), "scheduler sleeping");
        tokio::time::sleep(nap.to_std().unwrap_or(std::time::Duration::from_secs(1))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five_pm() -> DailyTrigger {
        DailyTrigger::new(NaiveTime::from_hms_opt(17, 0, 0).unwrap(), TimeDelta::minutes(5))
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn due_only_inside_the_window() {
        let t = five_pm();
        assert!(t.due_slot(at(18, 16, 59), None).is_none());
        assert!(t.due_slot(at(18, 17, 0), None).is_some());
        assert!(t.due_slot(at(18, 17, 4), None).is_some());
        assert!(t.due_slot(at(18, 17, 5), None).is_none());
        assert!(t.due_slot(at(18, 23, 0), None).is_none());
    }

    #[test]
    fn fires_at_most_once_per_day() {
        let t = five_pm();
        assert_eq!(t.due_slot(at(18, 17, 1), None), Some(day(18)));
        // A restart after posting sees the persisted date.
        assert!(t.due_slot(at(18, 17, 3), Some(day(18))).is_none());
        assert!(t.due_slot(at(19, 17, 0), Some(day(18))).is_some());
    }

    #[test]
    fn window_may_cross_midnight() {
        let t = DailyTrigger::new(NaiveTime::from_hms_opt(23, 58, 0).unwrap(), TimeDelta::minutes(5));
        assert_eq!(t.due_slot(at(19, 0, 1), None), Some(day(18)));
        assert!(t.due_slot(at(19, 0, 1), Some(day(18))).is_none());
        assert!(t.due_slot(at(19, 0, 3), None).is_none());
    }

    #[test]
    fn next_fire_rolls_over() {
        let t = five_pm();
        assert_eq!(t.next_fire(at(18, 9, 0)), at(18, 17, 0));
        assert_eq!(t.next_fire(at(18, 17, 0)), at(19, 17, 0));
        assert_eq!(t.next_fire(at(18, 20, 0)), at(19, 17, 0));
    }
}
