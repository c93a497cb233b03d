//! Endpoint capacity as advertised by the Overpass `/api/status` resource.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`ApiStatus`] | Parsed status page (rate limit, running and limited slots) |
//! | [`CapacitySnapshot`] | An `ApiStatus` pinned to the instant it was read |
//! | [`StatusState`] | Never read / read successfully / known to be broken |
//! | [`SlotCapacity`] | Free slots, or unlimited |
//!
//! A snapshot is stale the moment it is taken. Limited slots carry a countdown,
//! and [`CapacitySnapshot`] discounts those whose countdown has already elapsed.

mod parser;
mod probe;

pub use parser::parse_status;
pub use probe::{fetch_status, refresh, status_url};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Parsed content of the status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiStatus {
    pub client_id: String,
    pub current_time: Option<String>,
    /// Concurrent slots granted to this client; 0 means unlimited.
    pub rate_limit: u32,
    pub slots_limited: Vec<LimitedSlot>,
    pub slots_running: Vec<RunningSlot>,
}

/// A slot blocked by rate limiting until `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitedSlot {
    pub time: String,
    /// Seconds until the slot frees up, relative to when the page was read.
    pub available_in: u64,
}

/// A query the server is currently executing for this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningSlot {
    pub pid: u64,
    pub space_limit: u64,
    pub time_limit: u64,
    pub start_time: String,
}

/// Free capacity of an endpoint. `Unlimited` orders above any `Limited` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCapacity {
    Limited(usize),
    Unlimited,
}

impl SlotCapacity {
    pub fn has_room(&self) -> bool {
        match self {
            SlotCapacity::Limited(n) => *n > 0,
            SlotCapacity::Unlimited => true,
        }
    }

    /// Apply a local concurrency ceiling to otherwise unlimited capacity.
    pub fn capped(self, max_slots: Option<usize>, running: usize) -> Self {
        match (self, max_slots) {
            (SlotCapacity::Unlimited, Some(max)) => {
                SlotCapacity::Limited(max.saturating_sub(running))
            }
            (capacity, _) => capacity,
        }
    }
}

impl fmt::Display for SlotCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotCapacity::Limited(n) => write!(f, "{}", n),
            SlotCapacity::Unlimited => f.write_str("unlimited"),
        }
    }
}

/// An [`ApiStatus`] together with the instant it was captured.
#[derive(Debug, Clone)]
pub struct CapacitySnapshot {
    pub status: ApiStatus,
    pub captured_at: Instant,
}

impl CapacitySnapshot {
    pub fn new(status: ApiStatus) -> Self {
        Self::captured(status, Instant::now())
    }

    pub fn captured(status: ApiStatus, captured_at: Instant) -> Self {
        Self {
            status,
            captured_at,
        }
    }

    /// Limited slots whose countdown has not elapsed at `now`.
    pub fn limited_at(&self, now: Instant) -> usize {
        let elapsed = now.saturating_duration_since(self.captured_at);
        self.status
            .slots_limited
            .iter()
            .filter(|slot| Duration::from_secs(slot.available_in) > elapsed)
            .count()
    }

    /// Free slots given `running` queries of our own in flight.
    pub fn available_slots(&self, running: usize, now: Instant) -> SlotCapacity {
        if self.status.rate_limit == 0 {
            return SlotCapacity::Unlimited;
        }
        let used = running.saturating_add(self.limited_at(now));
        SlotCapacity::Limited((self.status.rate_limit as usize).saturating_sub(used))
    }

    /// Shortest countdown among the limited slots.
    pub fn earliest_release(&self) -> Option<Duration> {
        self.status
            .slots_limited
            .iter()
            .map(|slot| Duration::from_secs(slot.available_in))
            .min()
    }
}

/// What an endpoint knows about its capacity.
#[derive(Debug, Clone, Default)]
pub enum StatusState {
    /// Status has never been requested.
    #[default]
    Uninitialized,
    Known(CapacitySnapshot),
    /// The status resource is missing or malformed; capacity is treated as
    /// open-ended for the rest of the process lifetime.
    Unavailable,
}

impl StatusState {
    pub fn label(&self) -> &'static str {
        match self {
            StatusState::Uninitialized => "uninitialized",
            StatusState::Known(_) => "known",
            StatusState::Unavailable => "unavailable",
        }
    }

    pub fn snapshot(&self) -> Option<&CapacitySnapshot> {
        match self {
            StatusState::Known(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn available_slots(&self, running: usize, now: Instant) -> SlotCapacity {
        match self {
            StatusState::Known(snapshot) => snapshot.available_slots(running, now),
            StatusState::Uninitialized | StatusState::Unavailable => SlotCapacity::Unlimited,
        }
    }
}
