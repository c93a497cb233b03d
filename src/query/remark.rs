//! Error fragments embedded in response bodies.
//!
//! Overpass reports failures that happen after the status line was sent as a
//! `remark` (a JSON field, or `<remark>` lines at the end of XML output), and
//! reports query syntax errors as an HTML page with one `<strong>` block per error.

use once_cell::sync::Lazy;
use regex::Regex;

/// XML remarks sit in the last few lines, ahead of the closing root tag.
pub const XML_REMARK_TAIL_LINES: usize = 4;

static XML_REMARK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<remark>\s*(.+?)\s*</remark>").expect("static regex must compile")
});

static BAD_REQUEST_DETAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</strong>: ([^<]+) </p>").expect("static regex must compile"));

/// Collect `<remark>` messages from the tail of an XML body.
///
/// The last remark must fall within the final [`XML_REMARK_TAIL_LINES`] lines.
/// From there the scan walks backwards over consecutive remark lines and stops
/// at the first line that is not one. Messages are returned in document order.
pub fn xml_remarks(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let tail_start = lines.len().saturating_sub(XML_REMARK_TAIL_LINES);

    let Some(last) = (tail_start..lines.len())
        .rev()
        .find(|&i| XML_REMARK.is_match(lines[i]))
    else {
        return Vec::new();
    };

    let mut remarks: Vec<String> = lines[..=last]
        .iter()
        .rev()
        .map_while(|line| XML_REMARK.captures(line).map(|c| c[1].to_string()))
        .collect();
    remarks.reverse();
    remarks
}

/// Extract every error detail from a 400 response page.
pub fn bad_request_errors(html: &str) -> Vec<String> {
    BAD_REQUEST_DETAIL
        .captures_iter(html)
        .map(|c| unescape_quotes(&c[1]))
        .collect()
}

fn unescape_quotes(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}
