//! Task model for the cadence scheduling engine.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::slot::TimeSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Unscheduled,
    Scheduled,
    InProgress,
    Done,
    Missed,
}

impl TaskStatus {
    /// Done and Missed are terminal; no agent moves a task out of them.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Missed)
    }
}

/// Core task record.
///
/// Lives in exactly one owner's registry; agents mutate it in place during
/// a cycle. The engine never deletes tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub owner: String,

    /// Day the task is planned for.
    pub day: NaiveDate,

    pub title: String,

    /// Minutes.
    pub estimated_minutes: i64,

    /// Higher means more important.
    pub priority: i32,

    /// Optional hard deadline (UTC).
    pub deadline: Option<DateTime<Utc>>,

    /// Preferred start time of day; the optimizer pulls the slot toward it.
    pub preferred_start: Option<NaiveTime>,

    pub status: TaskStatus,

    /// Assigned slot, present iff the scheduler placed the task.
    pub slot: Option<TimeSlot>,

    /// Smoothed focus estimate in [0, 1]. Starts at 0 until signals arrive.
    pub focus_score: f64,

    /// Total minutes reported through progress signals.
    pub minutes_logged: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Registry insertion sequence; final ordering tie-break.
    #[serde(default)]
    pub seq: u64,
}

impl Task {
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn validate(&self) -> EngineResult<()> {
        validate_fields(&self.title, self.estimated_minutes)?;
        if !(0.0..=1.0).contains(&self.focus_score) {
            return Err(EngineError::InvalidTask(format!(
                "focus score must be within 0..=1, got {}",
                self.focus_score
            )));
        }
        if let Some(slot) = &self.slot {
            if slot.start >= slot.end {
                return Err(EngineError::InvalidTask(
                    "slot start must precede slot end".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Draft for a task a collaborator wants created. The engine assigns the id
/// and timestamps on acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub owner: String,
    pub day: NaiveDate,
    pub title: String,
    pub estimated_minutes: i64,
    pub priority: i32,
    pub deadline: Option<DateTime<Utc>>,
    pub preferred_start: Option<NaiveTime>,
}

impl NewTask {
    pub fn new(
        owner: impl Into<String>,
        day: NaiveDate,
        title: impl Into<String>,
        estimated_minutes: i64,
    ) -> Self {
        Self {
            owner: owner.into(),
            day,
            title: title.into(),
            estimated_minutes,
            priority: 3,
            deadline: None,
            preferred_start: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_preferred_start(mut self, at: NaiveTime) -> Self {
        self.preferred_start = Some(at);
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        validate_fields(&self.title, self.estimated_minutes)
    }
}

fn validate_fields(title: &str, estimated_minutes: i64) -> EngineResult<()> {
    if title.trim().is_empty() {
        return Err(EngineError::InvalidTask("title must not be empty".to_string()));
    }
    if estimated_minutes <= 0 {
        return Err(EngineError::InvalidTask(format!(
            "estimated minutes must be positive, got {estimated_minutes}"
        )));
    }
    Ok(())
}
