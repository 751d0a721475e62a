//! Engine configuration: the day's capacity window plus agent thresholds.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::slot::{self, TimeSlot};

/// Working hours tasks may be scheduled into, as wall-clock times on the
/// cycle's day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Slot grid size; every assignment starts and ends on this grid.
    #[serde(default = "default_granularity")]
    pub slot_granularity_minutes: u32,

    /// How far ahead of a slot start reminders fire.
    #[serde(default = "default_lookahead")]
    pub reminder_lookahead_minutes: i64,

    /// EMA weight for new focus samples, in (0, 1].
    #[serde(default = "default_alpha")]
    pub focus_smoothing_alpha: f64,

    /// Focus below this escalates reminder urgency.
    #[serde(default = "default_low_focus")]
    pub low_focus_threshold: f64,

    /// Working hours; serialized last so the flat keys stay ahead of the
    /// sub-table in config files.
    #[serde(default = "default_capacity_window")]
    pub capacity_window: CapacityWindow,
}

fn default_capacity_window() -> CapacityWindow {
    CapacityWindow { start: hm(9, 0), end: hm(17, 0) }
}

fn default_granularity() -> u32 {
    15
}

fn default_lookahead() -> i64 {
    30
}

fn default_alpha() -> f64 {
    0.5
}

fn default_low_focus() -> f64 {
    0.4
}

fn hm(hours: u32, minutes: u32) -> NaiveTime {
    // In-range literals only.
    NaiveTime::from_hms_opt(hours, minutes, 0).expect("in-range time literal")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: default_granularity(),
            reminder_lookahead_minutes: default_lookahead(),
            focus_smoothing_alpha: default_alpha(),
            low_focus_threshold: default_low_focus(),
            capacity_window: default_capacity_window(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations no cycle could run against. Called once at
    /// engine construction, never re-checked per cycle.
    pub fn validate(&self) -> EngineResult<()> {
        if self.capacity_window.start >= self.capacity_window.end {
            return Err(EngineError::Configuration(
                "capacity window start must precede its end".to_string(),
            ));
        }
        if self.slot_granularity_minutes == 0 {
            return Err(EngineError::Configuration(
                "slot granularity must be positive".to_string(),
            ));
        }
        let window_minutes =
            (self.capacity_window.end - self.capacity_window.start).num_minutes();
        if i64::from(self.slot_granularity_minutes) > window_minutes {
            return Err(EngineError::Configuration(format!(
                "slot granularity {} exceeds the {window_minutes}-minute capacity window",
                self.slot_granularity_minutes
            )));
        }
        if self.reminder_lookahead_minutes < 0 {
            return Err(EngineError::Configuration(
                "reminder lookahead must not be negative".to_string(),
            ));
        }
        if !(self.focus_smoothing_alpha > 0.0 && self.focus_smoothing_alpha <= 1.0) {
            return Err(EngineError::Configuration(format!(
                "focus smoothing alpha must be within (0, 1], got {}",
                self.focus_smoothing_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.low_focus_threshold) {
            return Err(EngineError::Configuration(format!(
                "low focus threshold must be within 0..=1, got {}",
                self.low_focus_threshold
            )));
        }
        Ok(())
    }

    pub fn window_start_on(&self, day: NaiveDate) -> DateTime<Utc> {
        slot::day_instant(day, self.capacity_window.start)
    }

    pub fn window_end_on(&self, day: NaiveDate) -> DateTime<Utc> {
        slot::day_instant(day, self.capacity_window.end)
    }

    pub fn day_window(&self, day: NaiveDate) -> TimeSlot {
        TimeSlot::new(self.window_start_on(day), self.window_end_on(day))
    }

    pub fn lookahead(&self) -> Duration {
        Duration::minutes(self.reminder_lookahead_minutes)
    }
}
