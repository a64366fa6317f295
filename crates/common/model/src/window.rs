use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A closed time interval `[start, end]`. Samples dated after `end` belong to a later cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` long window ending at `end`.
    pub fn days_before(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_window_is_closed_on_both_ends() {
        let end = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).single().expect("date");
        let window = Window::days_before(end, 7);

        assert_eq!(window.start, end - Duration::days(7));
        assert!(window.contains(window.start));
        assert!(window.contains(end));
        assert!(!window.contains(end + Duration::milliseconds(1)));
        assert!(!window.contains(window.start - Duration::milliseconds(1)));
    }
}
