//! Daily scheduling
//!
//! The scheduler waits for the configured local time, runs the job once,
//! and waits for the next day's slot. Time is read through a `Clock` so the
//! loop can be driven deterministically in tests.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime, TimeZone};
use tracing::{debug, info};

use crate::error::{BackupError, BackupResult};

/// Longest single sleep while waiting for the next slot
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Source of wall-clock time
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
    fn sleep(&self, duration: Duration);
}

/// The real clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Fires once a day at a fixed local hour and minute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    time: NaiveTime,
}

impl DailyTrigger {
    pub fn new(hour: u32, minute: u32) -> BackupResult<Self> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            BackupError::Validation(format!("Invalid time of day {:02}:{:02}", hour, minute))
        })?;
        Ok(Self { time })
    }

    /// First firing time strictly after `after`
    pub fn next_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = after.timezone();
        let mut date = after.date_naive();
        loop {
            let naive = date.and_time(self.time);
            // Inside a DST gap the slot does not exist; use the hour after
            let candidate = tz
                .from_local_datetime(&naive)
                .earliest()
                .or_else(|| {
                    tz.from_local_datetime(&(naive + ChronoDuration::hours(1)))
                        .earliest()
                });
            if let Some(candidate) = candidate {
                if candidate > *after {
                    return candidate;
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => return after.clone(),
            };
        }
    }
}

pub struct Scheduler<C> {
    clock: C,
    trigger: DailyTrigger,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C, trigger: DailyTrigger) -> Self {
        Self { clock, trigger }
    }

    /// Run `job` at every trigger time, `max_runs` times or forever
    ///
    /// The job receives the scheduled firing time. Returns the number of runs.
    pub fn run<F>(&self, max_runs: Option<usize>, mut job: F) -> usize
    where
        F: FnMut(DateTime<Local>),
    {
        let mut runs = 0;
        let mut last = self.clock.now();

        while max_runs.map_or(true, |max| runs < max) {
            let fire_at = self.trigger.next_after(&last);
            info!("Next backup scheduled at {}", fire_at.format("%Y-%m-%d %H:%M"));
            self.wait_until(fire_at);

            job(fire_at);
            runs += 1;

            // A job that overran the next slot skips it rather than firing late
            let now = self.clock.now();
            last = if now > fire_at { now } else { fire_at };
        }

        runs
    }

    fn wait_until(&self, target: DateTime<Local>) {
        loop {
            let now = self.clock.now();
            if now >= target {
                return;
            }
            let remaining = (target - now).to_std().unwrap_or(Duration::ZERO);
            let nap = remaining.min(MAX_SLEEP);
            debug!(seconds = nap.as_secs(), "Waiting for next slot");
            self.clock.sleep(nap);
        }
    }
}
