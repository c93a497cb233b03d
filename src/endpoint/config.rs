use std::env;
use std::time::Duration;

/// Scheduling and retry settings for one endpoint.
///
/// Built once (optionally from the environment) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Upper bound between two admission / capacity checks of a waiting query.
    pub poll_interval: Duration,
    /// Pause after a 504 before the query is sent again.
    pub gateway_timeout_pause: Duration,
    /// `None` retries gateway timeouts forever.
    pub gateway_timeout_retries: Option<u32>,
    /// When false a 429 is surfaced to the caller instead of waited out.
    pub retry_rate_limited: bool,
    /// `None` waits out rate limiting forever.
    pub rate_limit_retries: Option<u32>,
    /// Local concurrency ceiling used when the server grants unlimited slots
    /// or publishes no status page.
    pub max_slots: Option<usize>,
    /// Added to the shortest rate-limit countdown before the deferred status refresh.
    pub refresh_margin: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            gateway_timeout_pause: Duration::from_millis(2000),
            gateway_timeout_retries: None,
            retry_rate_limited: true,
            rate_limit_retries: None,
            max_slots: None,
            refresh_margin: Duration::from_secs(1),
        }
    }
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with environment overrides applied:
    /// - `OVERPASS_POLL_INTERVAL_MS`
    /// - `OVERPASS_GATEWAY_TIMEOUT_PAUSE_MS`
    /// - `OVERPASS_MAX_SLOTS`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ms) = env_u64("OVERPASS_POLL_INTERVAL_MS").filter(|ms| *ms > 0) {
            cfg.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("OVERPASS_GATEWAY_TIMEOUT_PAUSE_MS") {
            cfg.gateway_timeout_pause = Duration::from_millis(ms);
        }
        if let Some(n) = env_u64("OVERPASS_MAX_SLOTS").filter(|n| *n > 0) {
            cfg.max_slots = Some(n as usize);
        }
        cfg
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_gateway_timeout_pause(mut self, pause: Duration) -> Self {
        self.gateway_timeout_pause = pause;
        self
    }

    pub fn with_gateway_timeout_retries(mut self, retries: u32) -> Self {
        self.gateway_timeout_retries = Some(retries);
        self
    }

    pub fn with_retry_rate_limited(mut self, retry: bool) -> Self {
        self.retry_rate_limited = retry;
        self
    }

    pub fn with_rate_limit_retries(mut self, retries: u32) -> Self {
        self.rate_limit_retries = Some(retries);
        self
    }

    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = Some(max_slots.max(1));
        self
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok())
}
