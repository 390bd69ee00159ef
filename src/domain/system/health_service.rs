use std::sync::RwLock;

use chrono::{DateTime, TimeDelta, Utc};

/// Tracks tick-loop liveness. The loop stamps each tick start; the liveness
/// probe fails once the last stamp falls further behind than one and a half
/// resolutions, which catches a wedged scrape without flapping on a slow one.
pub struct SchedulerHealth {
    resolution: TimeDelta,
    last_tick_start: RwLock<Option<DateTime<Utc>>>,
}

impl SchedulerHealth {
    pub fn new(resolution: std::time::Duration) -> Self {
        Self {
            resolution: TimeDelta::from_std(resolution).unwrap_or_else(|_| TimeDelta::seconds(60)),
            last_tick_start: RwLock::new(None),
        }
    }

    pub fn record_tick_start(&self, now: DateTime<Utc>) {
        *self
            .last_tick_start
            .write()
            .expect("scheduler health lock poisoned") = Some(now);
    }

    pub fn alive(&self, now: DateTime<Utc>) -> bool {
        let last = self
            .last_tick_start
            .read()
            .expect("scheduler health lock poisoned");
        match *last {
            Some(last) => now - last <= self.resolution * 3 / 2,
            // Not alive until the first tick has fired.
            None => false,
        }
    }
}
