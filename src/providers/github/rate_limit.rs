use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use reqwest::header::{HeaderMap, RETRY_AFTER};

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";
const MAX_WAIT: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
struct Quota {
    remaining: u64,
    reset: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LimiterState {
    quota: Option<Quota>,
    blocked_until: Option<DateTime<Utc>>,
}

/// Paces requests against the quota the API reports.
///
/// One limiter is shared by every concurrent pipeline. Each response updates
/// the last known quota; before each request callers wait for [`delay`]:
/// nothing while quota is plentiful, a proportional share of the reset window
/// once it runs low, and the full wait until reset once it falls to the floor.
///
/// [`delay`]: RateLimiter::delay
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
    min_remaining: u64,
}

impl RateLimiter {
    pub fn new(min_remaining: u64) -> Self {
        Self {
            state: Mutex::new(LimiterState::default()),
            min_remaining,
        }
    }

    /// Records quota and `retry-after` information from a response.
    pub fn observe(&self, headers: &HeaderMap) {
        self.observe_at(headers, Utc::now());
    }

    fn observe_at(&self, headers: &HeaderMap, now: DateTime<Utc>) {
        let remaining = header_u64(headers, REMAINING_HEADER);
        let reset = header_u64(headers, RESET_HEADER)
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        // Clamped to the wait cap so the timestamp arithmetic stays in range.
        let retry_after = header_u64(headers, RETRY_AFTER.as_str())
            .map(|secs| secs.min(MAX_WAIT.as_secs()))
            .and_then(|secs| chrono::Duration::try_seconds(i64::try_from(secs).ok()?))
            .and_then(|wait| now.checked_add_signed(wait));

        let Ok(mut state) = self.state.lock() else {
            return;
        };

        if let (Some(remaining), Some(reset)) = (remaining, reset) {
            debug!("Rate limit: {remaining} requests left, resets at {reset}");
            state.quota = Some(Quota { remaining, reset });
        }
        if let Some(until) = retry_after {
            state.blocked_until = Some(state.blocked_until.map_or(until, |b| b.max(until)));
        }
    }

    /// How long to hold off before the next request, if at all.
    pub fn delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        let state = self.state.lock().ok()?;

        let blocked = state
            .blocked_until
            .filter(|until| *until > now)
            .map(|until| until - now);

        let paced = state.quota.and_then(|quota| {
            if quota.reset <= now {
                return None;
            }
            let window = quota.reset - now;
            if quota.remaining <= self.min_remaining {
                Some(window)
            } else if quota.remaining <= self.min_remaining.saturating_mul(4) {
                let spare = i32::try_from(quota.remaining - self.min_remaining).unwrap_or(i32::MAX);
                Some(window / spare)
            } else {
                None
            }
        });

        let wait = match (blocked, paced) {
            (Some(a), Some(b)) => a.max(b),
            (a, b) => a.or(b)?,
        };

        wait.to_std().ok().map(|d| d.min(MAX_WAIT))
    }

    /// Sleeps for the current [`delay`](RateLimiter::delay), if any.
    pub async fn wait(&self) {
        if let Some(delay) = self.delay(Utc::now()) {
            if delay >= Duration::from_secs(5) {
                warn!(
                    "API quota nearly exhausted, pausing {}s before the next request",
                    delay.as_secs()
                );
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Whether a response signals that the quota is used up, either the
    /// primary quota or a secondary limit announced through `retry-after`.
    pub fn exhausted(headers: &HeaderMap) -> bool {
        header_u64(headers, REMAINING_HEADER) == Some(0)
            || header_u64(headers, RETRY_AFTER.as_str()).is_some()
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}
