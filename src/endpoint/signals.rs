use crate::status::SlotCapacity;
use serde::Serialize;

/// Point-in-time view of an endpoint's scheduler.
///
/// Facts only: no selection or retry logic reads these fields back. Callers
/// use them for dashboards, logs, or their own routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSignals {
    pub endpoint: String,
    /// `uninitialized`, `known` or `unavailable`.
    pub status: &'static str,
    /// Server rate limit when the status page was read; `Some(0)` means unlimited.
    pub rate_limit: Option<u32>,
    pub available: SlotCapacity,
    pub running: usize,
    pub admitted_total: u64,
    pub queued: usize,
    pub in_flight: usize,
    pub rate_limited_waiting: usize,
    pub gateway_timeout_waiting: usize,
    /// A deferred status refresh is scheduled.
    pub refresh_pending: bool,
}

impl EndpointSignals {
    /// Entries still in the queue, in any state.
    pub fn pending(&self) -> usize {
        self.queued + self.in_flight + self.rate_limited_waiting + self.gateway_timeout_waiting
    }
}
