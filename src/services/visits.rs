//! Cookie-based visit counting
//!
//! The index and about pages count how many days a browser has come back.
//! State lives entirely in two cookies: `visits` and `last_visit`.

use chrono::{DateTime, Duration, Utc};

pub const VISITS_COOKIE: &str = "visits";
pub const LAST_VISIT_COOKIE: &str = "last_visit";

/// Visit state carried between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitCounter {
    pub visits: u32,
    pub last_visit: DateTime<Utc>,
}

impl VisitCounter {
    /// Read the counter from raw cookie values.
    ///
    /// Missing or malformed values are treated as a first visit at `now`.
    pub fn from_cookies(visits: Option<&str>, last_visit: Option<&str>, now: DateTime<Utc>) -> Self {
        let visits = visits
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(1);
        let last_visit = last_visit
            .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);

        Self { visits, last_visit }
    }

    /// Account for a request made at `now`.
    ///
    /// The count goes up once a full day has passed since the recorded
    /// visit, which then moves to `now`. Otherwise the state is unchanged.
    pub fn register_visit(previous: Option<VisitCounter>, now: DateTime<Utc>) -> VisitCounter {
        match previous {
            None => VisitCounter {
                visits: 1,
                last_visit: now,
            },
            Some(prev) if now - prev.last_visit >= Duration::days(1) => VisitCounter {
                visits: prev.visits.saturating_add(1),
                last_visit: now,
            },
            Some(prev) => prev,
        }
    }

    /// `Set-Cookie` header values for both cookies
    pub fn to_set_cookie_headers(&self) -> [String; 2] {
        [
            format!("{}={}; Path=/; SameSite=Lax", VISITS_COOKIE, self.visits),
            format!(
                "{}={}; Path=/; SameSite=Lax",
                LAST_VISIT_COOKIE,
                self.last_visit.to_rfc3339()
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_first_visit() {
        let now = at(9, 1);
        let counter = VisitCounter::register_visit(None, now);
        assert_eq!(counter.visits, 1);
        assert_eq!(counter.last_visit, now);
    }

    #[test]
    fn test_same_day_keeps_state() {
        let first = VisitCounter::register_visit(None, at(9, 1));
        let second = VisitCounter::register_visit(Some(first), at(20, 1));
        assert_eq!(second, first);
    }

    #[test]
    fn test_next_day_increments() {
        let first = VisitCounter::register_visit(None, at(9, 1));
        let almost = VisitCounter::register_visit(Some(first), at(8, 2));
        assert_eq!(almost.visits, 1);

        let next = VisitCounter::register_visit(Some(first), at(9, 2));
        assert_eq!(next.visits, 2);
        assert_eq!(next.last_visit, at(9, 2));
    }

    #[test]
    fn test_from_cookies() {
        let now = at(12, 5);
        let parsed = VisitCounter::from_cookies(Some("4"), Some("2024-03-01T09:00:00+00:00"), now);
        assert_eq!(parsed.visits, 4);
        assert_eq!(parsed.last_visit, at(9, 1));

        let garbage = VisitCounter::from_cookies(Some("lots"), Some("yesterday"), now);
        assert_eq!(garbage.visits, 1);
        assert_eq!(garbage.last_visit, now);
    }

    #[test]
    fn test_cookie_headers() {
        let counter = VisitCounter {
            visits: 3,
            last_visit: at(9, 1),
        };
        let [visits, last] = counter.to_set_cookie_headers();
        assert_eq!(visits, "visits=3; Path=/; SameSite=Lax");
        assert!(last.starts_with("last_visit=2024-03-01T09:00:00+00:00;"));

        let round = VisitCounter::from_cookies(Some("3"), Some("2024-03-01T09:00:00+00:00"), at(0, 9));
        assert_eq!(round, counter);
    }
}
