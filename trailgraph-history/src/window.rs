use chrono::{DateTime, Duration, Utc};

/// The `[now - days, now]` range a history search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window ending at `now` and reaching back `days` whole days
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        let start = now
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains_millis(&self, millis: i64) -> bool {
        millis >= self.start_millis() && millis <= self.end_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_days_spans_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let window = TimeWindow::last_days(7, now);

        assert_eq!(window.end, now);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_contains_millis_is_inclusive() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let window = TimeWindow::last_days(1, now);

        assert!(window.contains_millis(window.start_millis()));
        assert!(window.contains_millis(window.end_millis()));
        assert!(!window.contains_millis(window.end_millis() + 1));
        assert!(!window.contains_millis(window.start_millis() - 1));
    }
}
