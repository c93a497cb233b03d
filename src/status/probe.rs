use super::{parse_status, ApiStatus, CapacitySnapshot, StatusState};
use crate::transport::Transport;
use crate::{Error, Result};
use tracing::{debug, warn};
use url::Url;

/// Derive the status resource from an interpreter URL.
///
/// `https://host/api/interpreter` becomes `https://host/api/status`; a URL that
/// does not end in `interpreter` gets `status` appended as a path segment.
pub fn status_url(endpoint: &Url) -> Url {
    let mut url = endpoint.clone();
    url.set_query(None);
    url.set_fragment(None);

    let mut segments: Vec<String> = endpoint
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).map(String::from).collect())
        .unwrap_or_default();
    match segments.last_mut() {
        Some(last) if last == "interpreter" => *last = "status".to_string(),
        _ => segments.push("status".to_string()),
    }
    url.set_path(&format!("/{}", segments.join("/")));
    url
}

/// Read and parse the status page.
///
/// Anything other than a successful `text/plain` response carrying a client id
/// is reported as [`Error::StatusUnavailable`].
pub async fn fetch_status(transport: &dyn Transport, status_url: &Url) -> Result<ApiStatus> {
    let reply = transport
        .get_status(status_url)
        .await
        .map_err(|e| Error::status_unavailable(format!("{} ({})", status_url, e)))?;

    if !reply.is_success() {
        return Err(Error::status_unavailable(format!(
            "{} answered HTTP {}",
            status_url, reply.status
        )));
    }

    match reply.media_type().as_deref() {
        Some("text/plain") => {}
        other => {
            return Err(Error::status_unavailable(format!(
                "response type incorrect ({})",
                other.unwrap_or("none")
            )))
        }
    }

    let text = reply
        .text()
        .await
        .map_err(|e| Error::status_unavailable(e.to_string()))?;
    parse_status(&text)
}

/// Capacity refresh that never fails: errors collapse into
/// [`StatusState::Unavailable`], since many valid endpoints expose no status page.
pub async fn refresh(transport: &dyn Transport, status_url: &Url) -> StatusState {
    match fetch_status(transport, status_url).await {
        Ok(status) => {
            debug!(
                status_url = %status_url,
                rate_limit = status.rate_limit,
                running = status.slots_running.len(),
                limited = status.slots_limited.len(),
                "api status refreshed"
            );
            StatusState::Known(CapacitySnapshot::new(status))
        }
        Err(e) => {
            warn!(status_url = %status_url, error = %e, "api status unavailable");
            StatusState::Unavailable
        }
    }
}
