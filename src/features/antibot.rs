use crate::core::error::FailureKind;
use std::time::Duration;

pub const USER_AGENTS: &[&str] = &[
    // Chrome Desktop (Windows, macOS, Linux)
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",

    // Firefox Desktop
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",

    // Safari Desktop
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",

    // Edge Desktop
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36 Edg/121.0.0.0",

    // Mobile
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8 Pro) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.210 Mobile Safari/537.36",
];

/// Browser-like headers sent alongside the rotated user agent.
pub fn get_stealth_headers() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("DNT", "1"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Cache-Control", "max-age=0"),
    ]
}

/// How long to wait before the next attempt.
///
/// `attempt` is the 1-based number of the attempt that just failed.
pub trait BackoffPolicy: Send + Sync {
    fn delay(&self, attempt: u32, kind: FailureKind) -> Duration;
}

/// Fixed cooldown on 429, uniform random wait in `[min_ms, max_ms]` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct JitteredBackoff {
    pub rate_limit_cooldown: Duration,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl JitteredBackoff {
    pub fn new(rate_limit_cooldown: Duration, min_ms: u64, max_ms: u64) -> Self {
        let (min_ms, max_ms) = if min_ms > max_ms {
            (max_ms, min_ms)
        } else {
            (min_ms, max_ms)
        };
        Self {
            rate_limit_cooldown,
            min_ms,
            max_ms,
        }
    }

    pub fn from_config(config: &crate::core::config::ScoutConfig) -> Self {
        let (min_ms, max_ms) = config.resolve_backoff_range();
        Self::new(config.resolve_rate_limit_cooldown(), min_ms, max_ms)
    }

    pub fn random_delay(&self) -> Duration {
        use rand::prelude::*;
        let mut rng = rand::rng();
        Duration::from_millis(rng.random_range(self.min_ms..=self.max_ms))
    }
}

impl Default for JitteredBackoff {
    /// 30s cooldown, 2-4s backoff.
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 2000, 4000)
    }
}

impl BackoffPolicy for JitteredBackoff {
    fn delay(&self, _attempt: u32, kind: FailureKind) -> Duration {
        match kind {
            FailureKind::RateLimited => self.rate_limit_cooldown,
            FailureKind::Transient => self.random_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agents() {
        assert!(USER_AGENTS.iter().all(|ua| ua.starts_with("Mozilla/5.0")));
    }

    #[test]
    fn rate_limit_uses_fixed_cooldown() {
        let policy = JitteredBackoff::default();
        for attempt in 1..=3 {
            assert_eq!(
                policy.delay(attempt, FailureKind::RateLimited),
                Duration::from_secs(30)
            );
        }
    }

    #[test]
    fn transient_delay_stays_in_range() {
        let policy = JitteredBackoff::new(Duration::from_secs(30), 4000, 2000);
        assert_eq!((policy.min_ms, policy.max_ms), (2000, 4000));
        for attempt in 1..=50 {
            let d = policy.delay(attempt, FailureKind::Transient);
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(4));
        }
    }
}
