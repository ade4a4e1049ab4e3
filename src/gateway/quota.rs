use crate::error::WorkspaceError;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-minute (rolling log) and per-day (fixed window from first call) request counters.
#[derive(Debug)]
pub struct QuotaWindow {
    per_minute: u32,
    per_day: u64,
    minute_log: VecDeque<Instant>,
    day_started: Option<Instant>,
    day_count: u64,
}

impl QuotaWindow {
    pub fn new(per_minute: u32, per_day: u64) -> Self {
        Self {
            per_minute: per_minute.max(1),
            per_day,
            minute_log: VecDeque::new(),
            day_started: None,
            day_count: 0,
        }
    }

    /// Count one call at `now`.
    ///
    /// `Ok(Some(wait))` means the minute is full and nothing was counted; the caller sleeps
    /// and asks again. An exhausted day is an error.
    pub fn try_acquire(&mut self, now: Instant) -> Result<Option<Duration>, WorkspaceError> {
        self.roll(now);

        if self.day_count >= self.per_day {
            return Err(WorkspaceError::RateLimitExceeded {
                limit: self.per_day,
            });
        }

        if self.minute_log.len() >= self.per_minute as usize {
            if let Some(oldest) = self.minute_log.front() {
                return Ok(Some((*oldest + MINUTE).saturating_duration_since(now)));
            }
        }

        self.minute_log.push_back(now);
        self.day_count += 1;
        self.day_started.get_or_insert(now);
        Ok(None)
    }

    fn roll(&mut self, now: Instant) {
        if self
            .day_started
            .is_some_and(|start| now.saturating_duration_since(start) >= DAY)
        {
            self.day_started = None;
            self.day_count = 0;
        }
        while self
            .minute_log
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= MINUTE)
        {
            self.minute_log.pop_front();
        }
    }

    pub fn minute_count(&mut self, now: Instant) -> usize {
        self.roll(now);
        self.minute_log.len()
    }

    pub fn day_count(&mut self, now: Instant) -> u64 {
        self.roll(now);
        self.day_count
    }

    pub fn daily_remaining(&mut self, now: Instant) -> u64 {
        self.per_day.saturating_sub(self.day_count(now))
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    pub fn per_day(&self) -> u64 {
        self.per_day
    }
}
