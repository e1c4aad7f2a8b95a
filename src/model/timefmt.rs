// File: ./src/model/timefmt.rs
use chrono::{DateTime, Utc};

/// `42s ago`, `5m ago`, `3h ago`, `2d ago`.
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - ts).num_seconds();
    if diff < 60 {
        format!("{}s ago", diff.max(0))
    } else if diff < 3600 {
        format!("{}m ago", diff / 60)
    } else if diff < 86400 {
        format!("{}h ago", diff / 3600)
    } else {
        format!("{}d ago", diff / 86400)
    }
}

/// `Expired`, `3d left` (beyond a day), `5h left`, `12m left`.
pub fn format_time_left(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (expires_at - now).num_seconds();
    if diff <= 0 {
        return "Expired".to_string();
    }
    let hours = diff / 3600;
    let minutes = (diff % 3600) / 60;
    if hours > 24 {
        format!("{}d left", hours / 24)
    } else if hours > 0 {
        format!("{}h left", hours)
    } else {
        format!("{}m left", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(format_relative_time(now - Duration::seconds(5), now), "5s ago");
        assert_eq!(format_relative_time(now - Duration::minutes(7), now), "7m ago");
        assert_eq!(format_relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_relative_time(now - Duration::days(2), now), "2d ago");
    }

    #[test]
    fn time_left_buckets() {
        let now = Utc::now();
        assert_eq!(format_time_left(now - Duration::seconds(1), now), "Expired");
        assert_eq!(format_time_left(now, now), "Expired");
        assert_eq!(format_time_left(now + Duration::minutes(30), now), "30m left");
        assert_eq!(format_time_left(now + Duration::hours(5), now), "5h left");
        // exactly 24h still shows hours
        assert_eq!(format_time_left(now + Duration::hours(24), now), "24h left");
        assert_eq!(format_time_left(now + Duration::hours(72), now), "3d left");
    }
}
