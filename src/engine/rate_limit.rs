//! Per-user cooldown between code fetches.
//!
//! The limiter is a process-local concurrent map from user identity to the
//! instant of their last attempt. It is advisory abuse protection, not a
//! billing control: losing the state on restart is accepted. The dashmap
//! entry API gives the per-key check-and-update the atomicity it needs under
//! concurrent requests from the same user.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

pub struct RateLimiter {
    cooldown: Duration,
    last_request: DashMap<String, Instant>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_request: DashMap::new(),
        }
    }

    /// Record an attempt for `key` if its cooldown has elapsed.
    ///
    /// On rejection returns the remaining whole seconds, rounded up. An
    /// attempt inside the window does not push the window out further.
    pub fn check_and_update(&self, key: &str) -> Result<(), u64> {
        self.check_and_update_at(key, Instant::now())
    }

    fn check_and_update_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        match self.last_request.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed < self.cooldown {
                    let remaining = self.cooldown - elapsed;
                    Err(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0))
                } else {
                    entry.insert(now);
                    Ok(())
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_passes() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        assert_eq!(limiter.check_and_update("user-1"), Ok(()));
    }

    #[test]
    fn attempt_inside_window_is_rejected_with_remaining_seconds() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();

        assert_eq!(limiter.check_and_update_at("user-1", start), Ok(()));
        assert_eq!(
            limiter.check_and_update_at("user-1", start + Duration::from_secs(3)),
            Err(7)
        );
        // Rejected attempts do not extend the window.
        assert_eq!(
            limiter.check_and_update_at("user-1", start + Duration::from_secs(9)),
            Err(1)
        );
    }

    #[test]
    fn attempt_after_window_passes_and_restarts_it() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();

        assert_eq!(limiter.check_and_update_at("user-1", start), Ok(()));
        assert_eq!(
            limiter.check_and_update_at("user-1", start + Duration::from_secs(10)),
            Ok(())
        );
        assert_eq!(
            limiter.check_and_update_at("user-1", start + Duration::from_secs(11)),
            Err(9)
        );
    }

    #[test]
    fn partial_seconds_round_up() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();

        assert_eq!(limiter.check_and_update_at("user-1", start), Ok(()));
        assert_eq!(
            limiter.check_and_update_at("user-1", start + Duration::from_millis(9500)),
            Err(1)
        );
    }

    #[test]
    fn users_are_tracked_independently() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let start = Instant::now();

        assert_eq!(limiter.check_and_update_at("user-1", start), Ok(()));
        assert_eq!(limiter.check_and_update_at("user-2", start), Ok(()));
    }

    #[test]
    fn zero_cooldown_never_limits() {
        let limiter = RateLimiter::new(Duration::ZERO);
        assert_eq!(limiter.check_and_update("user-1"), Ok(()));
        assert_eq!(limiter.check_and_update("user-1"), Ok(()));
    }
}
