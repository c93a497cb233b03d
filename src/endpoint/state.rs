use crate::status::{SlotCapacity, StatusState};
use std::collections::VecDeque;
use std::fmt;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Lifecycle of a submitted query.
///
/// `Completed` and `Failed` are terminal: entries in those states leave the
/// queue in the same step that assigns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryState {
    Queued,
    Admitted,
    InFlight,
    RateLimitedWait,
    GatewayTimeoutWait,
    Completed,
    Failed,
}

impl QueryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryState::Queued => "queued",
            QueryState::Admitted => "admitted",
            QueryState::InFlight => "in_flight",
            QueryState::RateLimitedWait => "rate_limited_wait",
            QueryState::GatewayTimeoutWait => "gateway_timeout_wait",
            QueryState::Completed => "completed",
            QueryState::Failed => "failed",
        }
    }

    /// States that count against the endpoint's concurrency.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            QueryState::Admitted | QueryState::InFlight | QueryState::GatewayTimeoutWait
        )
    }

    /// States competing for the next free slot.
    pub fn wants_slot(&self) -> bool {
        matches!(self, QueryState::Queued | QueryState::RateLimitedWait)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryState::Completed | QueryState::Failed)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in an endpoint's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedQuery {
    /// Assigned at submission, strictly increasing per endpoint.
    pub id: u64,
    pub name: Option<String>,
    pub state: QueryState,
}

pub(crate) struct RefreshTimer {
    pub generation: u64,
    pub handle: JoinHandle<()>,
}

/// Mutable scheduling state of one endpoint, guarded by a single mutex.
///
/// `running_count` is the scheduler's own bookkeeping. The server's view of
/// running slots is informational only, so a stale status page can never keep
/// a slot occupied forever.
#[derive(Default)]
pub(crate) struct EndpointState {
    pub snapshot: StatusState,
    pub next_id: u64,
    pub admitted_count: u64,
    pub running_count: usize,
    pub queue: VecDeque<QueuedQuery>,
    pub refresh_timer: Option<RefreshTimer>,
    pub timer_generation: u64,
}

impl EndpointState {
    pub fn enqueue(&mut self, name: Option<String>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.queue.push_back(QueuedQuery {
            id,
            name,
            state: QueryState::Queued,
        });
        id
    }

    pub fn available_slots(&self, now: Instant, max_slots: Option<usize>) -> SlotCapacity {
        self.snapshot
            .available_slots(self.running_count, now)
            .capped(max_slots, self.running_count)
    }

    /// Oldest entry still waiting for a slot.
    pub fn next_in_line(&self) -> Option<u64> {
        self.queue
            .iter()
            .find(|entry| entry.state.wants_slot())
            .map(|entry| entry.id)
    }

    /// Give `id` a slot if it is next in line and capacity allows.
    ///
    /// A fresh query moves to `Admitted`; one returning from rate limiting goes
    /// straight back to `InFlight`.
    pub fn try_take_slot(&mut self, id: u64, now: Instant, max_slots: Option<usize>) -> bool {
        if self.next_in_line() != Some(id) || !self.available_slots(now, max_slots).has_room() {
            return false;
        }
        let Some(entry) = self.queue.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        if entry.state == QueryState::Queued {
            entry.state = QueryState::Admitted;
            self.admitted_count += 1;
        } else {
            entry.state = QueryState::InFlight;
        }
        self.running_count += 1;
        true
    }

    /// Move `id` to a non-terminal state, releasing its slot when it stops holding one.
    pub fn set_state(&mut self, id: u64, state: QueryState) {
        let Some(entry) = self.queue.iter_mut().find(|entry| entry.id == id) else {
            return;
        };
        let held = entry.state.holds_slot();
        entry.state = state;
        if held && !state.holds_slot() {
            self.running_count = self.running_count.saturating_sub(1);
        } else if !held && state.holds_slot() {
            self.running_count += 1;
        }
    }

    /// Remove `id` from the queue. Returns the entry, marked `terminal`, if it was present.
    pub fn finish(&mut self, id: u64, terminal: QueryState) -> Option<QueuedQuery> {
        let index = self.queue.iter().position(|entry| entry.id == id)?;
        let mut entry = self.queue.remove(index)?;
        if entry.state.holds_slot() {
            self.running_count = self.running_count.saturating_sub(1);
        }
        entry.state = terminal;
        Some(entry)
    }

    pub fn has_waiting(&self) -> bool {
        self.queue.iter().any(|entry| entry.state.wants_slot())
    }

    pub fn count(&self, state: QueryState) -> usize {
        self.queue.iter().filter(|entry| entry.state == state).count()
    }

    /// Nobody has submitted here and the status page was never read.
    pub fn is_untouched(&self) -> bool {
        self.next_id == 0 && matches!(self.snapshot, StatusState::Uninitialized)
    }
}
