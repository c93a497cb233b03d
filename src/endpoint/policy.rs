use super::EndpointConfig;
use crate::query::OutcomeKind;
use std::time::Duration;

/// Internal decision for how to proceed after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Complete,
    /// Give the slot back and re-send once the endpoint has capacity again.
    WaitForCapacity,
    /// Keep the slot, pause, then re-send.
    Retry { delay: Duration },
    Fail,
}

/// Failures seen so far for one query, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Attempts {
    pub rate_limited: u32,
    pub gateway_timeouts: u32,
}

impl Attempts {
    pub fn total(&self) -> u32 {
        self.rate_limited + self.gateway_timeouts
    }
}

/// Internal policy engine for recoverable outcomes.
///
/// Bad requests and runtime errors are never retried: the same query would
/// fail the same way again.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    retry_rate_limited: bool,
    rate_limit_retries: Option<u32>,
    gateway_timeout_pause: Duration,
    gateway_timeout_retries: Option<u32>,
}

impl RetryPolicy {
    pub fn new(config: &EndpointConfig) -> Self {
        Self {
            retry_rate_limited: config.retry_rate_limited,
            rate_limit_retries: config.rate_limit_retries,
            gateway_timeout_pause: config.gateway_timeout_pause,
            gateway_timeout_retries: config.gateway_timeout_retries,
        }
    }

    /// Decide what to do next. `attempts` holds the failures before this one.
    pub fn decide(&self, kind: OutcomeKind, attempts: &Attempts) -> Decision {
        match kind {
            OutcomeKind::Success => Decision::Complete,
            OutcomeKind::RateLimited => {
                if self.retry_rate_limited && within(self.rate_limit_retries, attempts.rate_limited)
                {
                    Decision::WaitForCapacity
                } else {
                    Decision::Fail
                }
            }
            OutcomeKind::GatewayTimeout => {
                if within(self.gateway_timeout_retries, attempts.gateway_timeouts) {
                    Decision::Retry {
                        delay: self.gateway_timeout_pause,
                    }
                } else {
                    Decision::Fail
                }
            }
            OutcomeKind::BadRequest
            | OutcomeKind::RuntimeError
            | OutcomeKind::Other
            | OutcomeKind::TransportFailure => Decision::Fail,
        }
    }
}

fn within(cap: Option<u32>, done: u32) -> bool {
    cap.map_or(true, |max| done < max)
}
