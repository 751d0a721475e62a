//! Report stage: read-only aggregation over a reporting window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::{TaskFilter, TaskRegistry};
use crate::slot::TimeSlot;
use crate::task::TaskStatus;

/// Aggregates for every slotted task whose slot overlaps the window.
/// Tasks that never got a slot are invisible here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub done: usize,
    pub missed: usize,
    pub in_progress: usize,
    pub scheduled: usize,
    /// None when the window holds no tasks; no data is not a zero score.
    pub avg_focus: Option<f64>,
    pub scheduled_minutes: i64,
    pub completed_minutes: i64,
    pub completion_ratio: f64,
}

pub fn generate(
    registry: &TaskRegistry,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Report {
    let window = TimeSlot::new(window_start, window_end);
    let mut report = Report {
        window_start,
        window_end,
        done: 0,
        missed: 0,
        in_progress: 0,
        scheduled: 0,
        avg_focus: None,
        scheduled_minutes: 0,
        completed_minutes: 0,
        completion_ratio: 0.0,
    };

    let mut focus_total = 0.0;
    let mut counted = 0usize;

    for task in registry.list(TaskFilter::default()) {
        let Some(slot) = task.slot else { continue };
        if !slot.overlaps(&window) {
            continue;
        }
        counted += 1;
        focus_total += task.focus_score;
        report.scheduled_minutes += task.estimated_minutes;
        match task.status {
            TaskStatus::Done => {
                report.done += 1;
                report.completed_minutes += task.estimated_minutes;
            }
            TaskStatus::Missed => report.missed += 1,
            TaskStatus::InProgress => report.in_progress += 1,
            TaskStatus::Scheduled => report.scheduled += 1,
            TaskStatus::Unscheduled => {}
        }
    }

    if counted > 0 {
        report.avg_focus = Some(focus_total / counted as f64);
        if report.scheduled_minutes > 0 {
            report.completion_ratio =
                report.completed_minutes as f64 / report.scheduled_minutes as f64;
        }
    }
    report
}
