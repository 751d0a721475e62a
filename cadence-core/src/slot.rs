//! Time slots and free-capacity computation on the day's granularity grid.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)` a task occupies on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// Anchor a wall-clock time onto `day` as a UTC instant.
pub fn day_instant(day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(time))
}

/// Round `minutes` up to the next multiple of the granularity.
/// Callers keep both arguments positive.
pub fn snap_minutes(minutes: i64, granularity_minutes: u32) -> i64 {
    let g = granularity_minutes as i64;
    (minutes + g - 1) / g * g
}

/// Free capacity on `day`: maximal runs of unoccupied granularity ticks
/// inside the working window.
///
/// A tick starting before `now` is unavailable; assignments never begin in
/// the past. Ticks that collide with any occupied slot are skipped, so the
/// result is disjoint from `occupied` by construction.
pub fn free_slots(
    day: NaiveDate,
    window_start: NaiveTime,
    window_end: NaiveTime,
    granularity_minutes: u32,
    occupied: &[TimeSlot],
    now: DateTime<Utc>,
) -> Vec<TimeSlot> {
    let tick = Duration::minutes(granularity_minutes as i64);
    let window_close = day_instant(day, window_end);

    let mut free: Vec<TimeSlot> = Vec::new();
    let mut cursor = day_instant(day, window_start);
    while cursor + tick <= window_close {
        let granule = TimeSlot::new(cursor, cursor + tick);
        let busy = granule.start < now || occupied.iter().any(|s| s.overlaps(&granule));
        if !busy {
            match free.last_mut() {
                Some(last) if last.end == granule.start => last.end = granule.end,
                _ => free.push(granule),
            }
        }
        cursor += tick;
    }
    free
}
