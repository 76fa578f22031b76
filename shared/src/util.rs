/// Generate an opaque resource ID (UUID v4, hyphenated).
///
/// Orders, items and extras all share this format so IDs stay unique across
/// independent staff terminals writing to the same store.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse "HH:MM" into minutes since midnight (0..=1439)
pub fn parse_hhmm(value: &str) -> Option<u16> {
    let (h, m) = value.trim().split_once(':')?;
    let h: u16 = h.parse().ok()?;
    let m: u16 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Format minutes since midnight as "HH:MM"
pub fn format_hhmm(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
