use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// A user-defined same-day window during which an actuator must be on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: i64,
    pub actuator_id: i64,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub issued_by: String,
}

impl Schedule {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// The instant any ON command satisfying this window must expire.
    pub fn expires_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    /// True when two windows for the same actuator share a date and overlap
    /// in time. Used by schedule creation, not by the loop.
    pub fn overlaps(&self, other: &Schedule) -> bool {
        self.actuator_id == other.actuator_id
            && self.date == other.date
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

// ---------------------------------------------------------------------------
// Active-schedule selection
// ---------------------------------------------------------------------------

/// Select the schedule that is active at `now`, if any.
///
/// A window is active when it starts within the next minute (the grace
/// absorbs the tick granularity) and has not yet ended. When several
/// windows match, the one ending latest wins.
pub fn active_schedule(schedules: &[Schedule], now: NaiveDateTime) -> Option<&Schedule> {
    let graced = now + Duration::minutes(1);
    schedules
        .iter()
        .filter(|s| s.starts_at() <= graced && s.expires_at() > now)
        .max_by_key(|s| s.end_time)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 25).unwrap()
    }

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn sched(id: i64, start: NaiveTime, end: NaiveTime) -> Schedule {
        Schedule {
            id,
            actuator_id: 1,
            date: day(),
            start_time: start,
            end_time: end,
            issued_by: "user42".into(),
        }
    }

    #[test]
    fn window_in_progress_is_active() {
        let schedules = vec![sched(1, t(8, 0, 0), t(9, 0, 0))];
        let now = day().and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(active_schedule(&schedules, now).map(|s| s.id), Some(1));
    }

    #[test]
    fn window_starting_within_grace_is_active() {
        // Tick at 07:59:30 for an 08:00 start: inside the one-minute grace.
        let schedules = vec![sched(1, t(8, 0, 0), t(9, 0, 0))];
        let now = day().and_hms_opt(7, 59, 30).unwrap();
        assert_eq!(active_schedule(&schedules, now).map(|s| s.id), Some(1));
    }

    #[test]
    fn window_starting_beyond_grace_is_not_active() {
        let schedules = vec![sched(1, t(8, 0, 0), t(9, 0, 0))];
        let now = day().and_hms_opt(7, 58, 0).unwrap();
        assert!(active_schedule(&schedules, now).is_none());
    }

    #[test]
    fn ended_window_is_not_active() {
        let schedules = vec![sched(1, t(8, 0, 0), t(9, 0, 0))];
        let now = day().and_hms_opt(9, 0, 0).unwrap();
        assert!(active_schedule(&schedules, now).is_none());
    }

    #[test]
    fn overlapping_windows_pick_latest_end() {
        let schedules = vec![
            sched(1, t(8, 0, 0), t(9, 0, 0)),
            sched(2, t(8, 15, 0), t(10, 0, 0)),
        ];
        let now = day().and_hms_opt(8, 30, 0).unwrap();
        assert_eq!(active_schedule(&schedules, now).map(|s| s.id), Some(2));
    }

    #[test]
    fn overlap_detection() {
        let a = sched(1, t(8, 0, 0), t(9, 0, 0));
        let b = sched(2, t(8, 30, 0), t(9, 30, 0));
        let c = sched(3, t(9, 0, 0), t(10, 0, 0));
        assert!(a.overlaps(&b));
        // Back-to-back windows do not overlap.
        assert!(!a.overlaps(&c));

        let mut other_day = b.clone();
        other_day.date = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        assert!(!a.overlaps(&other_day));

        let mut other_actuator = b.clone();
        other_actuator.actuator_id = 2;
        assert!(!a.overlaps(&other_actuator));
    }
}
