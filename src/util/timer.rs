//! Cooperative timers driven by an explicit clock.
//!
//! Nothing here spawns threads: the owner polls with the current time in
//! seconds (egui's `input.time` in the app) and acts on what has become due.

/// A one-shot point in time after which something should happen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadline {
    due: f64,
}

impl Deadline {
    pub fn after(now: f64, delay_secs: f64) -> Self {
        Self {
            due: now + delay_secs.max(0.0),
        }
    }

    pub fn due(&self) -> f64 {
        self.due
    }

    pub fn is_due(&self, now: f64) -> bool {
        now >= self.due
    }
}

/// A fixed-period task that stays scheduled until cancelled.
///
/// Dropping the task is equivalent to cancelling it.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatingTask {
    period: f64,
    next_due: Option<f64>,
    max_catch_up: u32,
}

impl RepeatingTask {
    /// Schedule the first run one `period` after `now`
    pub fn start(now: f64, period_secs: f64, max_catch_up: u32) -> Self {
        let period = period_secs.max(1e-3);
        Self {
            period,
            next_due: Some(now + period),
            max_catch_up: max_catch_up.max(1),
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn is_active(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<f64> {
        self.next_due
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    /// How many runs became due by `now`, advancing the schedule past them.
    ///
    /// At most `max_catch_up` runs are reported per poll; a caller that fell
    /// further behind skips the rest and resumes one period from `now`.
    pub fn due_ticks(&mut self, now: f64) -> u32 {
        let Some(mut next) = self.next_due else {
            return 0;
        };
        let mut ticks = 0;
        while now >= next && ticks < self.max_catch_up {
            ticks += 1;
            next += self.period;
        }
        if now >= next {
            next = now + self.period;
        }
        self.next_due = Some(next);
        ticks
    }
}
