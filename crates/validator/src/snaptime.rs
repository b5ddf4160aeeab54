use chrono::{DateTime, FixedOffset, Utc};

/// Parse the timestamp out of a snapshot directory name like
/// `data.20240101T000001+0000` or `home.20250605T000001-0700`. The part
/// before the first dot is a free-form label; the rest is basic-format
/// ISO 8601 with a numeric offset.
pub fn parse_snapshot_time(name: &str) -> Option<DateTime<FixedOffset>> {
    let stamp = match name.split_once('.') {
        Some((_, rest)) => rest,
        None => name,
    };
    DateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S%z").ok()
}

/// The window a delta between two snapshots spans: everything recorded
/// as modified should carry an mtime inside it.
pub fn snapshot_window(old_name: &str, new_name: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = parse_snapshot_time(old_name)?.with_timezone(&Utc);
    let end = parse_snapshot_time(new_name)?.with_timezone(&Utc);
    Some((start, end))
}

#[cfg(test)]
#[path = "snaptime_tests.rs"]
mod tests;
