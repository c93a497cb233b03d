use crate::status::SlotCapacity;
use serde::{Deserialize, Serialize};

/// How a manager picks the endpoint for the next query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum SelectionPolicy {
    /// Untouched endpoints first, then the most free slots, then the shortest queue.
    #[default]
    BestAvailable,
    RoundRobin,
    /// Always the endpoint at this position in the configured list.
    Endpoint(usize),
}

/// What selection needs to know about one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub untouched: bool,
    pub available: SlotCapacity,
    pub pending: usize,
}

/// Pick an index under [`SelectionPolicy::BestAvailable`].
///
/// Ties resolve to the earlier endpoint in configuration order.
pub(crate) fn pick_best(candidates: &[Candidate]) -> usize {
    if let Some(index) = candidates.iter().position(|c| c.untouched) {
        return index;
    }

    let with_room = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.available.has_room())
        .max_by(|(ia, a), (ib, b)| a.available.cmp(&b.available).then(ib.cmp(ia)));
    if let Some((index, _)) = with_room {
        return index;
    }

    candidates
        .iter()
        .enumerate()
        .min_by_key(|(index, c)| (c.pending, *index))
        .map(|(index, _)| index)
        .unwrap_or(0)
}
