//! Small helpers shared across modules.

/// Format a byte count as KiB or MiB with two decimals.
pub fn human_readable_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b > MIB {
        format!("{:.2}MiB", b / MIB)
    } else {
        format!("{:.2}KiB", b / KIB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_kib_and_mib() {
        assert_eq!(human_readable_bytes(512), "0.50KiB");
        assert_eq!(human_readable_bytes(3 * 1024 * 1024 + 1024 * 512), "3.50MiB");
    }
}
