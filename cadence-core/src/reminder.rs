//! Reminder stage: a pure projection of the day's schedule into the
//! reminders due within the lookahead. Recomputed every cycle, never stored.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::registry::{TaskFilter, TaskRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub task_id: String,
    pub title: String,
    /// The slot start the reminder points at.
    pub trigger_at: DateTime<Utc>,
    pub urgency: Urgency,
}

/// At most one reminder per task: slot starts within the lookahead, task
/// still live. High needs both a near deadline and focus under the
/// threshold; a near deadline alone is Medium.
pub fn project(
    registry: &TaskRegistry,
    config: &EngineConfig,
    day: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<Reminder> {
    let lookahead = config.lookahead();
    let mut reminders: Vec<Reminder> = Vec::new();

    for task in registry.list(TaskFilter::for_day(day)) {
        if task.status.is_terminal() {
            continue;
        }
        let Some(slot) = task.slot else { continue };
        let until_start = slot.start - now;
        if until_start < Duration::zero() || until_start > lookahead {
            continue;
        }

        let deadline_near = task.deadline.is_some_and(|d| d <= now + lookahead);
        let urgency = if deadline_near && task.focus_score < config.low_focus_threshold {
            Urgency::High
        } else if deadline_near {
            Urgency::Medium
        } else {
            Urgency::Low
        };
        reminders.push(Reminder {
            task_id: task.id.clone(),
            title: task.title.clone(),
            trigger_at: slot.start,
            urgency,
        });
    }

    reminders.sort_by(|a, b| {
        a.trigger_at.cmp(&b.trigger_at).then_with(|| a.task_id.cmp(&b.task_id))
    });
    reminders
}
