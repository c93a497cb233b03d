use super::{ApiStatus, LimitedSlot, RunningSlot};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

static SLOT_AVAILABLE_AFTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Slot available after: (.+?), in (-?\d+) seconds?\.?$")
        .expect("static regex must compile")
});

/// Parse the plain-text status page.
///
/// Labelled lines (`Connected as:`, `Current time:`, `Rate limit:`,
/// `Slot available after:`) may appear in any order. Blank lines, lines
/// mentioning `available` and the `Currently running` header are skipped;
/// every other line is read as a tab-separated running slot
/// (`pid, space limit, time limit, start time`). Lines that do not have that
/// shape are ignored.
pub fn parse_status(text: &str) -> Result<ApiStatus> {
    let mut client_id = None;
    let mut current_time = None;
    let mut rate_limit = 0u32;
    let mut slots_limited = Vec::new();
    let mut slots_running = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');

        if let Some(rest) = line.strip_prefix("Connected as:") {
            client_id = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Current time:") {
            current_time = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("Rate limit:") {
            rate_limit = rest.trim().parse().map_err(|_| {
                Error::status_unavailable(format!("invalid rate limit line: {:?}", line))
            })?;
        } else if let Some(caps) = SLOT_AVAILABLE_AFTER.captures(line) {
            let seconds: i64 = caps[2].parse().unwrap_or(0);
            slots_limited.push(LimitedSlot {
                time: caps[1].to_string(),
                available_in: seconds.max(0) as u64,
            });
        } else if line.trim().is_empty()
            || line.starts_with("Currently")
            || line.contains("available")
        {
            continue;
        } else if let Some(slot) = parse_running_slot(line) {
            slots_running.push(slot);
        } else {
            trace!(line, "ignoring unrecognised status line");
        }
    }

    let client_id = client_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::status_unavailable("status page has no client id"))?;

    Ok(ApiStatus {
        client_id,
        current_time,
        rate_limit,
        slots_limited,
        slots_running,
    })
}

fn parse_running_slot(line: &str) -> Option<RunningSlot> {
    let mut fields = line.split('\t').map(str::trim);
    let pid = fields.next()?.parse().ok()?;
    let space_limit = fields.next()?.parse().ok()?;
    let time_limit = fields.next()?.parse().ok()?;
    let start_time = fields.next()?.to_string();
    Some(RunningSlot {
        pid,
        space_limit,
        time_limit,
        start_time,
    })
}
